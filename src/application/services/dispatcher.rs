use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use crate::application::error::EngineError;
use crate::domain::entities::alert::{Alert, AlertUpdate};
use crate::domain::ports::notifier::{ChatPoster, EmailSender, NotificationError, RealtimePublisher};
use crate::domain::ports::store::AlertStore;

pub const EVENT_ALERT_NEW: &str = "alert:new";
pub const EVENT_CHAT_MESSAGE: &str = "chat:message";

#[must_use]
pub fn user_scope(recipient_id: &str) -> String {
    format!("user:{recipient_id}")
}

#[must_use]
pub fn conversation_scope(conversation_id: &str) -> String {
    format!("conversation:{conversation_id}")
}

/// Result of one delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered,
    Disabled,
    Failed(String),
}

impl ChannelOutcome {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// The alert with delivery flags as persisted after dispatch.
    pub alert: Alert,
    pub realtime: ChannelOutcome,
    pub email: ChannelOutcome,
    pub chat: ChannelOutcome,
}

/// Fans an alert out to the realtime, email and chat channels.
///
/// Channels run concurrently, each under its own timeout. A failing channel
/// never affects the others and never fails the dispatch.
pub struct Dispatcher {
    store: Arc<dyn AlertStore>,
    realtime: Arc<dyn RealtimePublisher>,
    email: Arc<dyn EmailSender>,
    chat: Arc<dyn ChatPoster>,
    channel_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        store: Arc<dyn AlertStore>,
        realtime: Arc<dyn RealtimePublisher>,
        email: Arc<dyn EmailSender>,
        chat: Arc<dyn ChatPoster>,
        channel_timeout: Duration,
    ) -> Self {
        Self {
            store,
            realtime,
            email,
            chat,
            channel_timeout,
        }
    }

    /// One channel call under the channel timeout, as an engine `Channel` error.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, NotificationError>>,
    ) -> Result<T, EngineError> {
        match tokio::time::timeout(self.channel_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(NotificationError::Timeout(self.channel_timeout).into()),
        }
    }

    async fn persist_flags(&self, alert: &Alert, flags: &AlertUpdate) -> Alert {
        match tokio::time::timeout(self.channel_timeout, self.store.update(alert.id, flags)).await
        {
            Ok(Ok(updated)) => updated,
            Ok(Err(e)) => {
                tracing::warn!(alert_id = %alert.id, "Could not persist delivery flags: {e}");
                alert.clone()
            }
            Err(_) => {
                tracing::warn!(
                    alert_id = %alert.id,
                    timeout_ms = u64::try_from(self.channel_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Persisting delivery flags timed out"
                );
                alert.clone()
            }
        }
    }

    pub async fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let (realtime, email, chat) = tokio::join!(
            self.push_realtime(alert),
            self.send_email(alert),
            self.post_chat(alert)
        );

        let flags = AlertUpdate {
            email_sent: email.is_delivered().then_some(true),
            chat_sent: chat.is_delivered().then_some(true),
            ..AlertUpdate::default()
        };

        let alert = if flags == AlertUpdate::default() {
            alert.clone()
        } else {
            self.persist_flags(alert, &flags).await
        };

        tracing::debug!(
            alert_id = %alert.id,
            ?realtime,
            ?email,
            ?chat,
            "Alert dispatched"
        );

        DispatchReport {
            alert,
            realtime,
            email,
            chat,
        }
    }

    async fn push_realtime(&self, alert: &Alert) -> ChannelOutcome {
        if !self.realtime.is_enabled() {
            return ChannelOutcome::Disabled;
        }
        let payload = match serde_json::to_value(alert) {
            Ok(value) => json!({ "alert": value }),
            Err(e) => return ChannelOutcome::Failed(format!("serialize alert: {e}")),
        };
        let scope = user_scope(&alert.recipient_id);
        match self
            .bounded(self.realtime.publish(&scope, EVENT_ALERT_NEW, &payload))
            .await
        {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, "Realtime push failed: {e}");
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }

    async fn send_email(&self, alert: &Alert) -> ChannelOutcome {
        if !self.email.is_enabled() {
            return ChannelOutcome::Disabled;
        }
        match self.bounded(self.email.send_alert_email(alert)).await {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, "Alert email failed: {e}");
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }

    async fn post_chat(&self, alert: &Alert) -> ChannelOutcome {
        if !self.chat.is_enabled() {
            return ChannelOutcome::Disabled;
        }
        let conversation_id = match self
            .bounded(self.chat.post_system_message(&alert.campaign_id, alert))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, "Chat post failed: {e}");
                return ChannelOutcome::Failed(e.to_string());
            }
        };

        // The message is already posted; a missed room event only delays clients.
        if self.realtime.is_enabled() {
            let payload = json!({
                "conversationId": conversation_id,
                "alertId": alert.id,
                "campaignId": alert.campaign_id,
                "title": alert.title,
                "priority": alert.priority,
                "sentAt": Utc::now().to_rfc3339(),
            });
            let scope = conversation_scope(&conversation_id);
            if let Err(e) = self
                .bounded(self.realtime.publish(&scope, EVENT_CHAT_MESSAGE, &payload))
                .await
            {
                tracing::warn!(%conversation_id, "Chat room event failed: {e}");
            }
        }
        ChannelOutcome::Delivered
    }
}
