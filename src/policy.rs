//! Notification policy
//!
//! Decides whether a captured fault should produce a notification at all.
//! Rules are applied in order and the first match wins:
//!
//! 1. no fault → `Suppress(NoError)`
//! 2. filesystem-operation warning → `Suppress(KnownNoise)`
//! 3. (non-test) no settings or no levels → `Suppress(Unconfigured)`;
//!    level not opted in → `Suppress(LevelDisabled)`
//! 4. (non-test) live suppression flag → `Suppress(RateLimited)`;
//!    otherwise the flag is set and the fault is allowed, as one atomic
//!    store operation
//!
//! Test invocations skip rules 3 and 4 and never write a flag.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::models::ErrorRecord;
use crate::settings::NotificationSettings;
use crate::severity::Severity;
use crate::suppression::{suppression_key, SuppressionStore};

/// Message fragments of operational warnings that never notify
pub const NOISE_PATTERNS: [&str; 3] = ["unlink", "rmdir", "mkdir"];

/// Why a fault did not produce a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuppressReason {
    /// No fault occurred
    NoError,
    /// Filesystem-operation warning
    KnownNoise,
    /// No settings or no levels configured
    Unconfigured,
    /// Severity is not opted in
    LevelDisabled,
    /// Same fingerprint already notified within the window
    RateLimited,
}

impl SuppressReason {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoError => "no-error",
            Self::KnownNoise => "known-noise",
            Self::Unconfigured => "unconfigured",
            Self::LevelDisabled => "level-disabled",
            Self::RateLimited => "rate-limited",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal policy decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Suppress(SuppressReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Whether a fault is an operational filesystem warning
pub fn is_known_noise(error: &ErrorRecord) -> bool {
    error.classification().is(Severity::Warning)
        && NOISE_PATTERNS.iter().any(|p| error.message.contains(p))
}

/// Gatekeeper between a captured fault and the delivery channels
pub struct NotificationPolicy {
    store: Arc<dyn SuppressionStore>,
    window: Duration,
    key_prefix: String,
}

impl NotificationPolicy {
    /// Create a policy with a one-hour window
    pub fn new(store: Arc<dyn SuppressionStore>) -> Self {
        Self {
            store,
            window: Duration::from_secs(3600),
            key_prefix: String::from("startle"),
        }
    }

    /// Set the suppression window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the suppression key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Suppression window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Evaluate a fault against the settings
    ///
    /// On `Allow` for a non-test fault the suppression flag has already been
    /// written, so a failing delivery cannot cause a repeat within the window.
    /// Store failures are logged and treated as "not suppressed".
    pub async fn evaluate(
        &self,
        error: Option<&ErrorRecord>,
        settings: Option<&NotificationSettings>,
        is_test: bool,
    ) -> Verdict {
        let Some(error) = error else {
            return Verdict::Suppress(SuppressReason::NoError);
        };

        if is_known_noise(error) {
            return Verdict::Suppress(SuppressReason::KnownNoise);
        }

        if is_test {
            return Verdict::Allow;
        }

        let settings = match settings {
            Some(s) if !s.is_empty() && !s.has_no_levels() => s,
            _ => return Verdict::Suppress(SuppressReason::Unconfigured),
        };

        if !settings.is_level_enabled(error.code) {
            return Verdict::Suppress(SuppressReason::LevelDisabled);
        }

        let key = suppression_key(&self.key_prefix, &error.message);

        match self.store.try_suppress(&key, self.window).await {
            Ok(true) => Verdict::Allow,
            Ok(false) => Verdict::Suppress(SuppressReason::RateLimited),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    category = %e.category(),
                    store = self.store.name(),
                    "Suppression check failed, notifying anyway"
                );
                Verdict::Allow
            }
        }
    }
}
