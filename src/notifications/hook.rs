//! Host integration: last-error capture and the shutdown hook

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::handler::{Outcome, ShutdownHandler};
use crate::models::{ErrorRecord, RequestContext};
use crate::severity::Severity;

/// Holds the most recent fatal fault of the process
#[derive(Debug, Clone, Default)]
pub struct LastErrorSlot {
    inner: Arc<Mutex<Option<ErrorRecord>>>,
}

impl LastErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fault, replacing any earlier one
    pub fn record(&self, error: ErrorRecord) {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner()) = Some(error);
    }

    /// Remove and return the recorded fault
    pub fn take(&self) -> Option<ErrorRecord> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    /// Copy of the recorded fault
    pub fn peek(&self) -> Option<ErrorRecord> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

/// Record panics into `slot` as fatal errors
///
/// The previously installed hook still runs afterwards.
pub fn install_panic_capture(slot: LastErrorSlot) {
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        let (file, line) = info
            .location()
            .map(|l| (l.file().to_string(), l.line()))
            .unwrap_or_else(|| ("unknown".to_string(), 0));

        slot.record(ErrorRecord::with_severity(Severity::Error, message, file, line));
        previous(info);
    }));
}

/// Fires the pipeline once at process termination
pub struct ShutdownHook {
    handler: Arc<ShutdownHandler>,
    slot: LastErrorSlot,
    fired: AtomicBool,
}

impl ShutdownHook {
    /// Register a hook reading from `slot`
    pub fn register(handler: Arc<ShutdownHandler>, slot: LastErrorSlot) -> Self {
        Self {
            handler,
            slot,
            fired: AtomicBool::new(false),
        }
    }

    /// Run the pipeline for the recorded fault
    ///
    /// Returns `None` if the hook already fired.
    pub async fn fire(&self, request: RequestContext) -> Option<Outcome> {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown hook already fired");
            return None;
        }

        let error = self.slot.take();
        Some(self.handler.handle(error, request, false).await)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
