//! Manual trigger surface for test notifications
//!
//! Each action synthesizes a fixed fatal error and drives the shutdown
//! handler with `is_test` set, so gating and rate limiting never apply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::handler::{ChannelSelection, Outcome, ShutdownHandler};
use crate::models::{ErrorRecord, RequestContext};

pub const TEST_ERROR_MESSAGE: &str = "This is a test error from Startle 💀";
pub const TEST_CHAT_MESSAGE: &str = "This is a test notification from Startle 💀";

/// A manually triggered action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestAction {
    /// Send a test email
    Email,
    /// Send a test chat notification
    Chat,
}

impl fmt::Display for TestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

impl FromStr for TestAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "chat" | "slack" => Ok(Self::Chat),
            other => Err(format!("Unknown test action: {other}")),
        }
    }
}

/// Payload of an [`ActionResponse`]
///
/// Success carries `{"message": ...}`; failure carries the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionData {
    Message { message: String },
    Text(String),
}

impl ActionData {
    pub fn message(&self) -> &str {
        match self {
            Self::Message { message } | Self::Text(message) => message,
        }
    }
}

/// Structured reply to the caller of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub data: ActionData,
}

impl ActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: ActionData::Message {
                message: message.into(),
            },
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: ActionData::Text(message.into()),
        }
    }

    /// Human-readable message of either shape
    pub fn message(&self) -> &str {
        self.data.message()
    }
}

/// Dispatches manual test actions
pub struct Actions {
    handler: Arc<ShutdownHandler>,
}

impl Actions {
    pub fn new(handler: Arc<ShutdownHandler>) -> Self {
        Self { handler }
    }

    /// Run an action and report the result
    pub async fn dispatch(&self, action: TestAction, request: RequestContext) -> ActionResponse {
        tracing::info!(action = %action, "Running test action");

        match action {
            TestAction::Email => {
                let error = ErrorRecord::synthetic(TEST_ERROR_MESSAGE);
                let outcome = self
                    .handler
                    .run(Some(error), request, true, ChannelSelection::EMAIL)
                    .await;
                Self::respond(&outcome, "email", "Test error sent successfully")
            }
            TestAction::Chat => {
                let configured = self
                    .handler
                    .load_settings()
                    .await
                    .is_some_and(|s| s.webhook_url().is_some());
                if !configured {
                    return ActionResponse::failure("Slack webhook URL not configured");
                }

                let error = ErrorRecord::synthetic(TEST_CHAT_MESSAGE);
                let outcome = self
                    .handler
                    .run(Some(error), request, true, ChannelSelection::CHAT)
                    .await;
                Self::respond(&outcome, "chat", "Test notification sent successfully")
            }
        }
    }

    fn respond(outcome: &Outcome, channel: &str, ok: &str) -> ActionResponse {
        match outcome {
            Outcome::Suppressed(reason) => {
                ActionResponse::failure(format!("Notification suppressed: {reason}"))
            }
            Outcome::Dispatched(_) => match outcome.status(channel) {
                Some(status) if status.success => ActionResponse::success(ok),
                Some(status) => ActionResponse::failure(
                    status
                        .message
                        .clone()
                        .unwrap_or_else(|| "Delivery failed".to_string()),
                ),
                None => ActionResponse::failure("Delivery failed"),
            },
        }
    }
}
