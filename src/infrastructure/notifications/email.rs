use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::application::config::EmailConfig;
use crate::domain::entities::alert::Alert;
use crate::domain::ports::notifier::{EmailSender, NotificationError};

/// Sends alert emails through an SMTP relay.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipient_domain: Option<String>,
}

impl SmtpEmailSender {
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the relay host or
    /// sender address is invalid.
    pub fn new(config: &EmailConfig, timeout: Duration) -> Result<Self, NotificationError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| {
                NotificationError::ChannelUnavailable(format!(
                    "invalid SMTP relay {}: {e}",
                    config.smtp_host
                ))
            })?
            .port(config.smtp_port)
            .timeout(Some(timeout));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = config.from.parse::<Mailbox>().map_err(|e| {
            NotificationError::ChannelUnavailable(format!("invalid sender {}: {e}", config.from))
        })?;

        Ok(Self {
            transport: builder.build(),
            from,
            recipient_domain: config.recipient_domain.clone(),
        })
    }

    /// Recipient ids that are not already addresses get the configured domain.
    fn address_for(&self, recipient_id: &str) -> Result<Mailbox, NotificationError> {
        let address = if recipient_id.contains('@') {
            recipient_id.to_string()
        } else if let Some(domain) = &self.recipient_domain {
            format!("{recipient_id}@{domain}")
        } else {
            return Err(NotificationError::SendFailed(format!(
                "no email address known for recipient {recipient_id}"
            )));
        };
        address.parse::<Mailbox>().map_err(|e| {
            NotificationError::SendFailed(format!("invalid recipient address {address}: {e}"))
        })
    }

    fn render(&self, alert: &Alert) -> Result<Message, NotificationError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.address_for(&alert.recipient_id)?)
            .subject(subject(alert))
            .header(ContentType::TEXT_PLAIN)
            .body(body(alert))
            .map_err(|e| NotificationError::SendFailed(format!("cannot build email: {e}")))
    }
}

fn subject(alert: &Alert) -> String {
    format!("[{}] {}", alert.priority, alert.title)
}

fn body(alert: &Alert) -> String {
    let mut text = format!(
        "{}\n\nCampaign: {}\nType: {}\nPriority: {}\nThreshold: {:.2}\nCurrent value: {:.2}\n",
        alert.message,
        alert.campaign_id,
        alert.alert_type,
        alert.priority,
        alert.threshold,
        alert.current_value,
    );
    if let Some(previous) = alert.previous_value {
        text.push_str(&format!("Previous value: {previous:.2}\n"));
    }
    text.push_str(&format!("Detected at: {}\n", alert.updated_at.to_rfc3339()));
    text
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_alert_email(&self, alert: &Alert) -> Result<(), NotificationError> {
        let message = self.render(alert)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP delivery failed: {e}")))?;
        tracing::debug!(alert_id = %alert.id, recipient = %alert.recipient_id, "Alert email sent");
        Ok(())
    }
}
