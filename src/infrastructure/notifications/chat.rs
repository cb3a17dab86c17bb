use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::entities::alert::Alert;
use crate::domain::ports::notifier::{ChatPoster, NotificationError};
use crate::domain::value_objects::priority::Priority;

use super::webhook::{http_client, post_json, WebhookFormat};

/// Posts alert summaries into a campaign's conversation as a system message.
///
/// Generic endpoints receive `{campaignId, alertId, sender: "system", text}`
/// and answer with the `conversationId` the message landed in. Slack and
/// Discord hooks get their native payloads and a conversation id derived
/// from the campaign.
pub struct WebhookChatPoster {
    url: String,
    client: reqwest::Client,
    format: WebhookFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostedMessage {
    conversation_id: String,
}

impl WebhookChatPoster {
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the HTTP client
    /// cannot be initialized.
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotificationError> {
        Ok(Self {
            format: WebhookFormat::detect(&url),
            url,
            client: http_client(timeout)?,
        })
    }

    const fn priority_color_hex(priority: Priority) -> &'static str {
        match priority {
            Priority::Low => "#3498DB",
            Priority::Medium => "#E67E22",
            Priority::High => "#E74C3C",
            Priority::Critical => "#FF0000",
        }
    }

    const fn priority_color_decimal(priority: Priority) -> u32 {
        match priority {
            Priority::Low => 0x00_34_98_DB,
            Priority::Medium => 0x00_E6_7E_22,
            Priority::High => 0x00_E7_4C_3C,
            Priority::Critical => 0x00_FF_00_00,
        }
    }

    /// Plain-text body shared by every format.
    #[must_use]
    pub fn message_text(alert: &Alert) -> String {
        format!(
            "{} [{}] {}\n{}",
            alert.priority.emoji(),
            alert.priority,
            alert.title,
            alert.message
        )
    }

    fn payload(&self, campaign_id: &str, alert: &Alert) -> Value {
        match self.format {
            WebhookFormat::Slack => json!({
                "attachments": [{
                    "color": Self::priority_color_hex(alert.priority),
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": format!("{} {}", alert.priority.emoji(), alert.title)
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                { "type": "mrkdwn", "text": format!("*Priority:*\n{}", alert.priority) },
                                { "type": "mrkdwn", "text": format!("*Campaign:*\n{campaign_id}") }
                            ]
                        },
                        {
                            "type": "section",
                            "text": { "type": "mrkdwn", "text": &alert.message }
                        }
                    ]
                }]
            }),
            WebhookFormat::Discord => json!({
                "username": "adsentry",
                "embeds": [{
                    "title": format!("{} {}", alert.priority.emoji(), alert.title),
                    "description": &alert.message,
                    "color": Self::priority_color_decimal(alert.priority),
                    "fields": [
                        { "name": "Priority", "value": alert.priority.to_string(), "inline": true },
                        { "name": "Type", "value": alert.alert_type.to_string(), "inline": true },
                        { "name": "Campaign", "value": campaign_id, "inline": true }
                    ],
                    "timestamp": alert.updated_at.to_rfc3339()
                }]
            }),
            WebhookFormat::Generic => json!({
                "campaignId": campaign_id,
                "alertId": alert.id,
                "recipientId": &alert.recipient_id,
                "sender": "system",
                "type": "SYSTEM",
                "priority": alert.priority,
                "text": Self::message_text(alert),
            }),
        }
    }
}

#[async_trait]
impl ChatPoster for WebhookChatPoster {
    async fn post_system_message(
        &self,
        campaign_id: &str,
        alert: &Alert,
    ) -> Result<String, NotificationError> {
        let response = post_json(&self.client, &self.url, &self.payload(campaign_id, alert)).await?;
        if self.format != WebhookFormat::Generic {
            return Ok(format!("campaign-{campaign_id}"));
        }
        let posted: PostedMessage = response.json().await.map_err(|e| {
            NotificationError::SendFailed(format!("chat endpoint returned no conversation: {e}"))
        })?;
        Ok(posted.conversation_id)
    }
}
