//! Chat webhook notification channel
//!
//! Posts the rendered block payload as JSON. A single attempt is made with a
//! bounded timeout; there are no retries, so a slow endpoint can never hold
//! up process shutdown for longer than the timeout.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::render::{ChatPayload, RenderedNotification};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used for webhook delivery
pub fn build_client(timeout: Duration) -> ChannelResult<Client> {
    if timeout.is_zero() {
        return Err(ChannelError::InvalidConfig(
            "Timeout must be greater than 0".to_string(),
        ));
    }

    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ChannelError::InvalidConfig(format!("Failed to create HTTP client: {e}")))
}

/// Validate a webhook URL
pub fn validate_url(url: &str) -> ChannelResult<()> {
    if url.is_empty() {
        return Err(ChannelError::InvalidConfig(
            "Webhook URL cannot be empty".to_string(),
        ));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ChannelError::InvalidConfig(
            "Webhook URL must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

/// Chat webhook channel
///
/// With no URL configured the channel is a no-op that reports a vacuous
/// success.
///
/// # Example
///
/// ```rust,ignore
/// use startle::notifications::channels::webhook::{build_client, WebhookChannel, DEFAULT_TIMEOUT};
///
/// let client = build_client(DEFAULT_TIMEOUT)?;
/// let channel = WebhookChannel::new(client, Some("https://hooks.slack.com/services/T/B/X"));
/// channel.post(&payload).await?;
/// ```
pub struct WebhookChannel {
    client: Client,
    url: Option<String>,
}

impl WebhookChannel {
    /// Create a webhook channel
    pub fn new(client: Client, url: Option<impl Into<String>>) -> Self {
        Self {
            client,
            url: url.map(Into::into).filter(|u: &String| !u.trim().is_empty()),
        }
    }

    /// Get the webhook URL
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// POST a payload to the webhook
    pub async fn post(&self, payload: &ChatPayload) -> ChannelResult<DeliveryStatus> {
        let Some(url) = &self.url else {
            tracing::debug!("No chat webhook configured, skipping");
            return Ok(DeliveryStatus::skipped(
                self.name(),
                "No webhook URL configured",
            ));
        };

        validate_url(url)?;

        let body = serde_json::to_string(payload)?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(status = %status, "Chat notification delivered");

        Ok(DeliveryStatus::success_with_message(
            self.name(),
            format!("Delivered (status: {status})"),
        ))
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "chat"
    }

    async fn send(&self, notification: &RenderedNotification) -> ChannelResult<DeliveryStatus> {
        self.post(&notification.chat).await
    }
}
