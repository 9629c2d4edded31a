//! Error severity classification
//!
//! Maps the raw numeric severity code reported by the host runtime to a
//! stable symbolic name. Classification is total: codes outside the known
//! set yield [`Classification::Unknown`] instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity kinds reported by the host interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Severity {
    /// Fatal run-time error
    Error,
    /// Run-time warning
    Warning,
    /// Compile-time parse error
    Parse,
    /// Run-time notice
    Notice,
    /// Fatal error during interpreter startup
    CoreError,
    /// Warning during interpreter startup
    CoreWarning,
    /// Fatal compile-time error
    CompileError,
    /// Compile-time warning
    CompileWarning,
    /// User-generated error
    UserError,
    /// User-generated warning
    UserWarning,
    /// User-generated notice
    UserNotice,
    /// Catchable fatal error
    RecoverableError,
    /// Deprecation notice
    Deprecated,
    /// User-generated deprecation notice
    UserDeprecated,
}

impl Severity {
    /// Every known severity, in code order
    pub const ALL: [Severity; 14] = [
        Self::Error,
        Self::Warning,
        Self::Parse,
        Self::Notice,
        Self::CoreError,
        Self::CoreWarning,
        Self::CompileError,
        Self::CompileWarning,
        Self::UserError,
        Self::UserWarning,
        Self::UserNotice,
        Self::RecoverableError,
        Self::Deprecated,
        Self::UserDeprecated,
    ];

    /// Raw numeric code
    pub const fn code(self) -> i32 {
        match self {
            Self::Error => 1,
            Self::Warning => 2,
            Self::Parse => 4,
            Self::Notice => 8,
            Self::CoreError => 16,
            Self::CoreWarning => 32,
            Self::CompileError => 64,
            Self::CompileWarning => 128,
            Self::UserError => 256,
            Self::UserWarning => 512,
            Self::UserNotice => 1024,
            Self::RecoverableError => 4096,
            Self::Deprecated => 8192,
            Self::UserDeprecated => 16384,
        }
    }

    /// Look up a severity by raw code
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Symbolic name as shown in notifications
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "E_ERROR",
            Self::Warning => "E_WARNING",
            Self::Parse => "E_PARSE",
            Self::Notice => "E_NOTICE",
            Self::CoreError => "E_CORE_ERROR",
            Self::CoreWarning => "E_CORE_WARNING",
            Self::CompileError => "E_COMPILE_ERROR",
            Self::CompileWarning => "E_COMPILE_WARNING",
            Self::UserError => "E_USER_ERROR",
            Self::UserWarning => "E_USER_WARNING",
            Self::UserNotice => "E_USER_NOTICE",
            Self::RecoverableError => "E_RECOVERABLE_ERROR",
            Self::Deprecated => "E_DEPRECATED",
            Self::UserDeprecated => "E_USER_DEPRECATED",
        }
    }

    /// Short guidance shown next to the level in the settings record listing
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::Error => Some("Recommended: A fatal run-time error that can't be recovered from."),
            Self::Warning => Some(
                "Warnings indicate that something unexpected happened, but the site didn't crash.",
            ),
            Self::Parse => Some("Recommended: A Parse error should catch things like syntax errors."),
            Self::Notice => Some(
                "Many plugins generate Notice-level errors, and these can usually be ignored.",
            ),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Severity> for i32 {
    fn from(severity: Severity) -> Self {
        severity.code()
    }
}

impl TryFrom<i32> for Severity {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, String> {
        Self::from_code(code).ok_or_else(|| format!("Unknown severity code: {code}"))
    }
}

/// Result of classifying a raw severity code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Code maps to a known severity
    Known(Severity),
    /// Code is outside the known set
    Unknown(i32),
}

impl Classification {
    /// Label used when rendering
    pub fn label(&self) -> &'static str {
        match self {
            Self::Known(severity) => severity.as_str(),
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// The known severity, if any
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Known(severity) => Some(*severity),
            Self::Unknown(_) => None,
        }
    }

    pub fn is(&self, severity: Severity) -> bool {
        self.severity() == Some(severity)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify a raw severity code
pub fn classify(code: i32) -> Classification {
    match Severity::from_code(code) {
        Some(severity) => Classification::Known(severity),
        None => Classification::Unknown(code),
    }
}

/// Levels offered for opt-in in the settings record
pub const REPORTABLE_LEVELS: [Severity; 7] = [
    Severity::Error,
    Severity::Warning,
    Severity::Parse,
    Severity::Notice,
    Severity::UserError,
    Severity::UserWarning,
    Severity::Deprecated,
];

/// Levels enabled when no settings have been saved yet
pub const DEFAULT_ENABLED_LEVELS: [Severity; 2] = [Severity::Error, Severity::Parse];
