//! Chat block payload rendering
//!
//! Produces the block sequence posted to the chat webhook:
//!
//! ```json
//! {
//!   "blocks": [
//!     {"type": "header", "text": {"type": "plain_text", "text": "💀 Fatal Error 💀", "emoji": true}},
//!     {"type": "section", "fields": [{"type": "mrkdwn", "text": "*Site:*\nexample.com"},
//!                                    {"type": "mrkdwn", "text": "*Time:*\n2024-03-01 20:30:00"}]},
//!     {"type": "section", "fields": [{"type": "mrkdwn", "text": "*Error Level:*\nE_ERROR"}]},
//!     {"type": "section", "text": {"type": "mrkdwn", "text": "*Error Message:*\n```boom```"}},
//!     {"type": "section", "fields": [{"type": "mrkdwn", "text": "*File:*\nb.php"},
//!                                    {"type": "mrkdwn", "text": "*Line:*\n10"}]},
//!     {"type": "context", "elements": [{"type": "mrkdwn", "text": "🔗 /shop"}]},
//!     {"type": "divider"}
//!   ]
//! }
//! ```
//!
//! The destination renders markdown, so the message is not HTML-escaped.

use serde::{Deserialize, Serialize};

use crate::models::{ErrorRecord, SiteContext};

/// Header text of every chat alert
pub const HEADER_TEXT: &str = "💀 Fatal Error 💀";

/// Hours added to the UTC timestamp shown in the chat payload
pub const CHAT_TIME_OFFSET_HOURS: i64 = 8;

/// A text object inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji: Option<bool>,
    },
    Mrkdwn {
        text: String,
    },
}

impl TextObject {
    /// Markdown text object
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    /// Plain text object with emoji rendering enabled
    pub fn plain_emoji(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: Some(true),
        }
    }

    /// The text content
    pub fn text(&self) -> &str {
        match self {
            Self::PlainText { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

/// A layout block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<TextObject>>,
    },
    Context {
        elements: Vec<TextObject>,
    },
    Divider,
}

impl Block {
    fn fields(fields: Vec<TextObject>) -> Self {
        Self::Section {
            text: None,
            fields: Some(fields),
        }
    }

    fn text(text: TextObject) -> Self {
        Self::Section {
            text: Some(text),
            fields: None,
        }
    }

    /// All text carried by this block, in order
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Header { text } => vec![text.text()],
            Self::Section { text, fields } => text
                .iter()
                .chain(fields.iter().flatten())
                .map(TextObject::text)
                .collect(),
            Self::Context { elements } => elements.iter().map(TextObject::text).collect(),
            Self::Divider => Vec::new(),
        }
    }
}

/// Chat webhook body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub blocks: Vec<Block>,
}

/// Renders the chat block payload
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatRenderer;

impl ChatRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Build the block sequence
    pub fn render(&self, error: &ErrorRecord, ctx: &SiteContext) -> ChatPayload {
        // TODO: the fixed +8h offset looks like a hardcoded timezone; make it configurable
        let shown_at = ctx.timestamp + chrono::Duration::hours(CHAT_TIME_OFFSET_HOURS);

        ChatPayload {
            blocks: vec![
                Block::Header {
                    text: TextObject::plain_emoji(HEADER_TEXT),
                },
                Block::fields(vec![
                    TextObject::mrkdwn(format!("*Site:*\n{}", ctx.display_host())),
                    TextObject::mrkdwn(format!(
                        "*Time:*\n{}",
                        shown_at.format("%Y-%m-%d %H:%M:%S")
                    )),
                ]),
                Block::fields(vec![TextObject::mrkdwn(format!(
                    "*Error Level:*\n{}",
                    error.classification().label()
                ))]),
                Block::text(TextObject::mrkdwn(format!(
                    "*Error Message:*\n```{}```",
                    error.message
                ))),
                Block::fields(vec![
                    TextObject::mrkdwn(format!("*File:*\n{}", error.file_basename())),
                    TextObject::mrkdwn(format!("*Line:*\n{}", error.line)),
                ]),
                Block::Context {
                    elements: vec![TextObject::mrkdwn(format!(
                        "🔗 {}",
                        ctx.request.request_uri
                    ))],
                },
                Block::Divider,
            ],
        }
    }
}
