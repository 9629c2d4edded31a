//! Notification channels for delivering alerts
//!
//! Each channel takes the rendered payloads of one notification and makes a
//! single best-effort delivery attempt. Channels are independent: the
//! outcome of one never affects another.

pub mod email;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::render::RenderedNotification;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur during channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No recipient addresses configured
    #[error("No notification emails configured")]
    NoRecipients,

    /// An address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Mail transport failed
    #[error("Mail transport failed: {0}")]
    Transport(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Invalid channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Payload could not be produced
    #[error("Render failed: {0}")]
    Render(String),
}

/// Response from sending a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Whether the notification was successfully delivered
    pub success: bool,
    /// Whether a transport call was made
    pub attempted: bool,
    /// Channel that delivered (or failed to deliver) the notification
    pub channel: String,
    /// Optional message about the delivery
    pub message: Option<String>,
    /// Timestamp of delivery attempt
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    /// Create a successful delivery status
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            success: true,
            attempted: true,
            channel: channel.into(),
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a successful delivery status with a message
    pub fn success_with_message(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(channel)
        }
    }

    /// Vacuous success: nothing to deliver, nothing attempted
    pub fn skipped(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attempted: false,
            ..Self::success_with_message(channel, message)
        }
    }

    /// Create a failed delivery status
    pub fn failure(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            attempted: true,
            channel: channel.into(),
            message: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Failed status for an error, noting whether a transport call was made
    pub fn from_error(channel: impl Into<String>, error: &ChannelError) -> Self {
        let attempted = !matches!(
            error,
            ChannelError::NoRecipients
                | ChannelError::InvalidAddress(_)
                | ChannelError::InvalidConfig(_)
                | ChannelError::Render(_)
        );
        Self {
            attempted,
            ..Self::failure(channel, error.to_string())
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match (self.success, self.attempted) {
            (true, true) => "SUCCESS",
            (true, false) => "SKIPPED",
            (false, _) => "FAILED",
        };
        write!(f, "[{status}] {}", self.channel)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Trait for notification channels
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Deliver a rendered notification through this channel
    async fn send(&self, notification: &RenderedNotification) -> ChannelResult<DeliveryStatus>;
}
