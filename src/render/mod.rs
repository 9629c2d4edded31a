//! Channel-specific rendering of error records
//!
//! Both renderers share the same input: an [`ErrorRecord`] plus the
//! [`SiteContext`] it happened in. [`NotificationRenderer`] renders every
//! payload once per notification so that each channel sends the same content.
//! A failed email render only fails the email channel; the chat payload is
//! built without a template and is always available.

pub mod chat;
pub mod email;

use uuid::Uuid;

use crate::error::Result;
use crate::models::{ErrorRecord, SiteContext};

pub use chat::{Block, ChatPayload, ChatRenderer, TextObject};
pub use email::EmailRenderer;

/// All payloads for one notification
#[derive(Debug, Clone)]
pub struct RenderedNotification {
    /// Correlation id for logs
    pub id: Uuid,
    /// Email subject line
    pub subject: String,
    /// Email HTML body, or the reason it could not be rendered
    pub html_body: std::result::Result<String, String>,
    /// Chat webhook body
    pub chat: ChatPayload,
}

/// Renders every channel payload for a notification
pub struct NotificationRenderer<'a> {
    email: EmailRenderer<'a>,
    chat: ChatRenderer,
}

impl<'a> NotificationRenderer<'a> {
    /// Create a renderer with the built-in templates
    pub fn new() -> Result<Self> {
        Ok(Self {
            email: EmailRenderer::new()?,
            chat: ChatRenderer::new(),
        })
    }

    /// Create a renderer around a custom email renderer
    pub fn with_email_renderer(email: EmailRenderer<'a>) -> Self {
        Self {
            email,
            chat: ChatRenderer::new(),
        }
    }

    /// Render all payloads
    pub fn render(&self, error: &ErrorRecord, ctx: &SiteContext) -> RenderedNotification {
        let id = Uuid::new_v4();
        let html_body = self.email.render(error, ctx).map_err(|e| {
            tracing::error!(id = %id, error = %e, "Failed to render email body");
            e.to_string()
        });

        RenderedNotification {
            id,
            subject: self.email.subject(ctx),
            html_body,
            chat: self.chat.render(error, ctx),
        }
    }
}
