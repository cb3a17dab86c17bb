use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ports::notifier::{NotificationError, RealtimePublisher};

/// Forwards realtime events to several publishers.
///
/// Every publisher is called; the first error encountered is returned.
pub struct CompositePublisher {
    publishers: Vec<Box<dyn RealtimePublisher>>,
}

impl CompositePublisher {
    #[must_use]
    pub fn new(publishers: Vec<Box<dyn RealtimePublisher>>) -> Self {
        Self { publishers }
    }
}

#[async_trait]
impl RealtimePublisher for CompositePublisher {
    async fn publish(
        &self,
        scope: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), NotificationError> {
        let mut first_error = None;
        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(scope, event, payload).await {
                tracing::warn!(scope, event, "Realtime publish failed: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn is_enabled(&self) -> bool {
        self.publishers.iter().any(|p| p.is_enabled())
    }
}
