use async_trait::async_trait;
use serde_json::Value;

use crate::domain::entities::alert::Alert;
use crate::domain::ports::notifier::{
    ChatPoster, EmailSender, NotificationError, RealtimePublisher,
};

/// Stand-in for a channel that has no configuration.
///
/// Reports itself disabled so the dispatcher skips it and leaves the
/// matching delivery flag unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledChannel;

#[async_trait]
impl RealtimePublisher for DisabledChannel {
    async fn publish(&self, _: &str, _: &str, _: &Value) -> Result<(), NotificationError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[async_trait]
impl EmailSender for DisabledChannel {
    async fn send_alert_email(&self, _: &Alert) -> Result<(), NotificationError> {
        Err(NotificationError::ChannelUnavailable("email is not configured".into()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[async_trait]
impl ChatPoster for DisabledChannel {
    async fn post_system_message(&self, _: &str, _: &Alert) -> Result<String, NotificationError> {
        Err(NotificationError::ChannelUnavailable("chat is not configured".into()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
