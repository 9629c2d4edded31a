//! Unified error handling for the startle crate
//!
//! Domain errors from configuration, settings persistence, the suppression
//! store and payload rendering are folded into a single [`Error`] enum.
//! Delivery failures have their own [`ChannelError`] because they are never
//! propagated out of the pipeline; they end up as a failed
//! [`DeliveryStatus`](crate::notifications::channels::DeliveryStatus).
//!
//! # Usage
//!
//! ```rust,ignore
//! use startle::error::Error;
//!
//! fn report(err: &Error) {
//!     tracing::warn!(error = %err, category = %err.category(), "Suppression store unavailable");
//! }
//! ```
//!
//! [`ChannelError`]: crate::notifications::channels::ChannelError

use std::io;
use thiserror::Error;

pub use crate::notifications::channels::ChannelError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Redis connectivity and protocol errors
    Network,
    /// Settings and suppression persistence errors
    Store,
    /// Payload rendering errors
    Render,
    /// Serialization and parsing errors
    Parsing,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Store => "store",
            Self::Render => "render",
            Self::Parsing => "parsing",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for the startle crate
#[derive(Error, Debug)]
pub enum Error {
    /// Settings record could not be read or written
    #[error("Settings store error: {0}")]
    Settings(String),

    /// Suppression (rate-limit) store errors
    #[error("Suppression store error: {0}")]
    Suppression(String),

    /// Redis errors from the suppression backend
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Email template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Email template registration errors
    #[error("Template registration error: {0}")]
    TemplateRegistration(#[from] Box<handlebars::TemplateError>),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a settings store error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create a suppression store error
    pub fn suppression(msg: impl Into<String>) -> Self {
        Self::Suppression(msg.into())
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Redis(_) => ErrorCategory::Network,
            Self::Suppression(_) | Self::Settings(_) | Self::Io(_) => ErrorCategory::Store,
            Self::Template(_) | Self::TemplateRegistration(_) => ErrorCategory::Render,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::TemplateRegistration(Box::new(err))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
