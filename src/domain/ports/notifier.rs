use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::alert::Alert;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("notification channel timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Pushes structured events to connected clients. Connection bookkeeping
/// (who is online, which socket is in which room) belongs to the adapter.
#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Publish `event` with `payload` to every client subscribed to `scope`.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the event cannot be delivered.
    async fn publish(&self, scope: &str, event: &str, payload: &Value)
        -> Result<(), NotificationError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Render and send the alert email to the alert's recipient.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if rendering or delivery fails.
    async fn send_alert_email(&self, alert: &Alert) -> Result<(), NotificationError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait ChatPoster: Send + Sync {
    /// Post a system-authored summary of the alert into the conversation
    /// between the recipient and the campaign's counterpart. Returns the
    /// conversation id the message landed in.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if no conversation exists or posting fails.
    async fn post_system_message(
        &self,
        campaign_id: &str,
        alert: &Alert,
    ) -> Result<String, NotificationError>;

    fn is_enabled(&self) -> bool {
        true
    }
}
