//! startle - Fatal error notifications for web applications
//!
//! Captures the last fatal fault of a process and, subject to per-level
//! opt-in, noise filtering and a rate limit, sends an alert by email and to
//! a chat webhook.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`severity`] - Severity codes and their classification
//! - [`models`] - Error records and the site/request context
//! - [`settings`] - Persisted notification settings
//! - [`suppression`] - Rate-limit flags keyed by message fingerprint
//! - [`policy`] - The allow/suppress decision
//! - [`render`] - Email HTML and chat block payloads
//! - [`notifications`] - Channels, the shutdown handler and host hooks
//! - [`config`] - Process configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use startle::config::Config;
//! use startle::models::RequestContext;
//! use startle::notifications::{install_panic_capture, LastErrorSlot, ShutdownHandler, ShutdownHook};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let handler = Arc::new(ShutdownHandler::from_config(&config).await?);
//!
//!     let slot = LastErrorSlot::new();
//!     install_panic_capture(slot.clone());
//!     let hook = ShutdownHook::register(handler, slot);
//!
//!     // ... serve the request
//!
//!     hook.fire(RequestContext::new("/")).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod policy;
pub mod render;
pub mod settings;
pub mod severity;
pub mod suppression;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{ErrorRecord, RequestContext, SiteContext, SiteUser};
    pub use crate::notifications::{
        Actions, LastErrorSlot, Outcome, ShutdownHandler, ShutdownHook, TestAction,
    };
    pub use crate::policy::{NotificationPolicy, SuppressReason, Verdict};
    pub use crate::settings::{NotificationSettings, SettingsStore};
    pub use crate::severity::{classify, Classification, Severity};
}

// Direct re-exports for convenience
pub use models::{ErrorRecord, RequestContext};
pub use severity::Severity;
