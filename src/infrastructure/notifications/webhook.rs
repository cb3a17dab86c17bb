use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::ports::notifier::{NotificationError, RealtimePublisher};

/// Webhook flavour, auto-detected from the URL host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookFormat {
    Slack,
    Discord,
    Generic,
}

impl WebhookFormat {
    #[must_use]
    pub fn detect(url: &str) -> Self {
        // Compare the host only, so a path containing "slack" stays generic
        let host = url
            .split("//")
            .nth(1)
            .and_then(|s| s.split('/').next())
            .and_then(|h| h.split(':').next())
            .unwrap_or("");

        if host == "hooks.slack.com" {
            Self::Slack
        } else if host == "discord.com" || host == "discordapp.com" {
            Self::Discord
        } else {
            Self::Generic
        }
    }
}

/// Builds the shared HTTP client. The timeout covers DNS, connect and response.
///
/// # Errors
///
/// Returns `NotificationError::ChannelUnavailable` if the HTTP client
/// cannot be initialized (e.g. TLS backend failure).
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, NotificationError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            NotificationError::ChannelUnavailable(format!("cannot build HTTP client: {e}"))
        })
}

/// POST a JSON body and return the response body, failing on non-2xx.
///
/// # Errors
///
/// `ChannelUnavailable` when the endpoint cannot be reached, `SendFailed` on
/// an error status.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
) -> Result<reqwest::Response, NotificationError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| NotificationError::ChannelUnavailable(format!("{url}: {e}")))?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(NotificationError::SendFailed(format!(
            "{url} answered HTTP {}",
            response.status()
        )))
    }
}

/// Relays realtime events to a gateway that owns the client connections.
///
/// Each event is posted as `{"scope", "event", "payload"}`; the gateway maps
/// scopes to rooms and sockets.
pub struct WebhookRealtimePublisher {
    url: String,
    client: reqwest::Client,
}

impl WebhookRealtimePublisher {
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the HTTP client
    /// cannot be initialized.
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotificationError> {
        Ok(Self {
            url,
            client: http_client(timeout)?,
        })
    }

    fn envelope(scope: &str, event: &str, payload: &Value) -> Value {
        json!({
            "scope": scope,
            "event": event,
            "payload": payload,
        })
    }
}

#[async_trait]
impl RealtimePublisher for WebhookRealtimePublisher {
    async fn publish(
        &self,
        scope: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), NotificationError> {
        post_json(&self.client, &self.url, &Self::envelope(scope, event, payload)).await?;
        tracing::debug!(scope, event, "Realtime event relayed");
        Ok(())
    }
}
