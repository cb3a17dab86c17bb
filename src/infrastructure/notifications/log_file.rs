use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::ports::notifier::{NotificationError, RealtimePublisher};

const DEFAULT_LOG_PATH: &str = "~/.local/share/adsentry/events.jsonl";

/// Appends every realtime event to a JSON-lines file.
///
/// Useful on its own when no gateway is configured, and as an audit copy
/// next to one.
pub struct EventLogPublisher {
    path: PathBuf,
}

impl EventLogPublisher {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let expanded = shellexpand::tilde(path);
        Self {
            path: PathBuf::from(expanded.as_ref()),
        }
    }

    fn append_json_line(&self, value: &Value) -> Result<(), NotificationError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NotificationError::SendFailed(format!("cannot create event log directory: {e}"))
            })?;
        }

        let line = serde_json::to_string(value)
            .map_err(|e| NotificationError::SendFailed(format!("cannot serialize event: {e}")))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| NotificationError::SendFailed(format!("cannot open event log: {e}")))?;

        writeln!(file, "{line}")
            .map_err(|e| NotificationError::SendFailed(format!("cannot write event log: {e}")))
    }
}

impl Default for EventLogPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_PATH)
    }
}

#[async_trait]
impl RealtimePublisher for EventLogPublisher {
    async fn publish(
        &self,
        scope: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), NotificationError> {
        let entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "scope": scope,
            "event": event,
            "payload": payload,
        });
        self.append_json_line(&entry)
    }
}
