//! Fatal-error notification pipeline
//!
//! This module turns the last fault of a process into at most one
//! notification per channel. A [`ShutdownHook`] reads the fault recorded in a
//! [`LastErrorSlot`] and drives the [`ShutdownHandler`], which consults the
//! policy, renders once and fans out to every channel.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │      ShutdownHandler                       │
//! │  - Settings lookup                         │
//! │  - Policy verdict (noise, levels, rate)    │
//! │  - Render once                             │
//! │  - Concurrent channel dispatch             │
//! └────────────────────────────────────────────┘
//!                     │
//!             ┌───────┴───────┐
//!             ▼               ▼
//!       ┌─────────┐     ┌─────────┐
//!       │  Email  │     │  Chat   │
//!       │ Channel │     │ Webhook │
//!       └─────────┘     └─────────┘
//! ```
//!
//! # Features
//!
//! - **Fire once**: the hook runs the pipeline at most once per process
//! - **Independent channels**: a failing channel never blocks the other
//! - **Bounded**: every network call carries a timeout and is tried once
//! - **Test triggers**: [`Actions`] send synthetic notifications on demand
//!
//! # Example
//!
//! ```rust,ignore
//! use startle::notifications::{install_panic_capture, LastErrorSlot, ShutdownHandler, ShutdownHook};
//!
//! let handler = Arc::new(ShutdownHandler::from_config(&config).await?);
//! let slot = LastErrorSlot::new();
//! install_panic_capture(slot.clone());
//!
//! let hook = ShutdownHook::register(handler, slot);
//! // ... at termination
//! hook.fire(RequestContext::new("/checkout")).await;
//! ```

pub mod actions;
pub mod channels;
pub mod handler;
pub mod hook;

// Re-exports
pub use actions::{ActionResponse, Actions, TestAction};
pub use channels::email::{EmailChannel, MailTransport, SmtpMailTransport};
pub use channels::webhook::WebhookChannel;
pub use channels::{Channel, ChannelError, DeliveryStatus};
pub use handler::{ChannelSelection, HandlerState, Outcome, ShutdownHandler};
pub use hook::{install_panic_capture, LastErrorSlot, ShutdownHook};
