//! Core data structures for the notification pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::severity::{classify, Classification, Severity};

/// A fault captured by the host runtime
///
/// Field names follow the host's last-error record so that a JSON dump of
/// that record deserializes directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Raw severity code
    #[serde(rename = "type")]
    pub code: i32,
    /// Error message text
    pub message: String,
    /// Full path of the file that raised the fault
    pub file: String,
    /// Line number within `file`
    pub line: u32,
}

impl ErrorRecord {
    /// Create a new error record
    pub fn new(code: i32, message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            code,
            message: message.into(),
            file: file.into(),
            line,
        }
    }

    /// Create a record of a known severity
    pub fn with_severity(
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self::new(severity.code(), message, file, line)
    }

    /// Synthetic fatal error used by manual test triggers
    pub fn synthetic(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message, file!(), line!())
    }

    /// Classify the raw severity code
    pub fn classification(&self) -> Classification {
        classify(self.code)
    }

    /// Final path component of `file`
    pub fn file_basename(&self) -> &str {
        let trimmed = self.file.trim_end_matches(['/', '\\']);
        trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
    }
}

/// The authenticated user of the request that faulted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteUser {
    pub id: u64,
    pub display_name: String,
    pub email: String,
}

/// Per-request ambient context, sourced by the host adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Requested URI (path and query)
    #[serde(default)]
    pub request_uri: String,
    /// Referrer header, if any
    #[serde(default)]
    pub referrer: Option<String>,
    /// Currently authenticated user, if any
    #[serde(default)]
    pub user: Option<SiteUser>,
}

impl RequestContext {
    /// Create a request context for a URI
    pub fn new(request_uri: impl Into<String>) -> Self {
        Self {
            request_uri: request_uri.into(),
            ..Default::default()
        }
    }

    /// Set the referrer
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Set the authenticated user
    pub fn with_user(mut self, user: SiteUser) -> Self {
        self.user = Some(user);
        self
    }
}

/// Everything a renderer needs besides the error itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    /// Canonical site URL
    pub home_url: String,
    /// Human-readable site name (used in the `From:` header)
    pub site_name: String,
    /// Address notifications are sent from
    pub admin_email: String,
    /// Request that was being served
    pub request: RequestContext,
    /// When the notification was produced
    pub timestamp: DateTime<Utc>,
}

impl SiteContext {
    /// Build a context for the current moment
    pub fn new(site: &SiteConfig, request: RequestContext) -> Self {
        Self::at(site, request, Utc::now())
    }

    /// Build a context with a fixed timestamp
    pub fn at(site: &SiteConfig, request: RequestContext, timestamp: DateTime<Utc>) -> Self {
        Self {
            home_url: site.home_url.clone(),
            site_name: site.name.clone(),
            admin_email: site.admin_email.clone(),
            request,
            timestamp,
        }
    }

    /// Site URL without its protocol scheme
    pub fn display_host(&self) -> &str {
        self.home_url
            .strip_prefix("https://")
            .or_else(|| self.home_url.strip_prefix("http://"))
            .unwrap_or(&self.home_url)
    }
}
