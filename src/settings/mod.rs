//! Persisted notification settings
//!
//! The settings record is owned by the settings UI; the pipeline only reads
//! it. The record shape is fixed:
//!
//! ```json
//! {
//!   "notification_emails": "ops@example.com, dev@example.com",
//!   "slack_webhook_url": "https://hooks.slack.com/services/...",
//!   "levels": { "1": true, "2": false, "4": true }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::severity::{Severity, DEFAULT_ENABLED_LEVELS, REPORTABLE_LEVELS};

/// Notification settings record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Comma-separated recipient addresses
    #[serde(default)]
    pub notification_emails: String,

    /// Chat webhook endpoint; empty means not configured
    #[serde(default)]
    pub slack_webhook_url: String,

    /// Severity code to opt-in flag
    #[serde(default, deserialize_with = "deserialize_levels")]
    pub levels: BTreeMap<i32, bool>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        let levels = REPORTABLE_LEVELS
            .iter()
            .map(|level| (level.code(), DEFAULT_ENABLED_LEVELS.contains(level)))
            .collect();

        Self {
            notification_emails: String::new(),
            slack_webhook_url: String::new(),
            levels,
        }
    }
}

impl NotificationSettings {
    /// Settings with no recipients, no webhook and no levels
    pub fn empty() -> Self {
        Self {
            notification_emails: String::new(),
            slack_webhook_url: String::new(),
            levels: BTreeMap::new(),
        }
    }

    /// Set the recipient list
    pub fn with_emails(mut self, emails: impl Into<String>) -> Self {
        self.notification_emails = emails.into();
        self
    }

    /// Set the webhook URL
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.slack_webhook_url = url.into();
        self
    }

    /// Enable or disable a level
    pub fn with_level(mut self, severity: Severity, enabled: bool) -> Self {
        self.levels.insert(severity.code(), enabled);
        self
    }

    /// True when nothing at all has been configured
    pub fn is_empty(&self) -> bool {
        self.notification_emails.trim().is_empty()
            && self.slack_webhook_url.trim().is_empty()
            && self.levels.is_empty()
    }

    /// True when no level has been configured
    pub fn has_no_levels(&self) -> bool {
        self.levels.is_empty()
    }

    /// Raw codes with an enabled flag
    pub fn enabled_levels(&self) -> BTreeSet<i32> {
        self.levels
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(code, _)| *code)
            .collect()
    }

    /// Whether notifications are enabled for a raw severity code
    pub fn is_level_enabled(&self, code: i32) -> bool {
        self.levels.get(&code).copied().unwrap_or(false)
    }

    /// Parsed recipient list: trimmed, empty entries dropped, first occurrence kept
    pub fn recipients(&self) -> Vec<String> {
        parse_recipients(&self.notification_emails)
    }

    /// Webhook URL, if configured
    pub fn webhook_url(&self) -> Option<&str> {
        let url = self.slack_webhook_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

/// Split a comma-separated address list
pub fn parse_recipients(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .filter(|addr| seen.insert(addr.to_string()))
        .map(str::to_string)
        .collect()
}

// Checkbox values are persisted as "1"/"" strings by form handlers; accept
// those alongside booleans and numbers.
fn deserialize_levels<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<i32, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<i32, serde_json::Value> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(code, value)| {
            let enabled = match value {
                serde_json::Value::Bool(b) => b,
                serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
                serde_json::Value::String(s) => !s.is_empty() && s != "0",
                _ => false,
            };
            (code, enabled)
        })
        .collect())
}

/// Read access to the persisted settings record
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the record; `None` when nothing has been saved
    async fn load(&self) -> Result<Option<NotificationSettings>>;

    /// Persist the record
    async fn save(&self, settings: &NotificationSettings) -> Result<()>;
}

/// Settings record stored as a JSON file
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the record
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<Option<NotificationSettings>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::with_source(
                    format!("Failed to read settings: {}", self.path.display()),
                    e,
                ))
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let settings = serde_json::from_str(&content).map_err(|e| {
            Error::settings(format!(
                "Failed to parse settings {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(Some(settings))
    }

    async fn save(&self, settings: &NotificationSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, json).await?;

        tracing::info!(path = %self.path.display(), "Saved notification settings");
        Ok(())
    }
}

/// In-process settings record
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Option<NotificationSettings>>,
}

impl MemorySettingsStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `settings`
    pub fn with_settings(settings: NotificationSettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Option<NotificationSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &NotificationSettings) -> Result<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}
