//! Configuration management for startle
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Process configuration (site identity, transports,
//! rate-limit backend, logging) lives here; the per-site notification
//! settings record is owned by [`crate::settings`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted suppression window (30 days)
pub const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site identity
    pub site: SiteConfig,

    /// Settings record location
    pub settings: SettingsConfig,

    /// SMTP transport configuration
    pub smtp: SmtpConfig,

    /// Chat webhook delivery configuration
    pub webhook: WebhookConfig,

    /// Payload template overrides
    pub templates: TemplateConfig,

    /// Rate-limit (suppression) configuration
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Site identity used in subjects, headers and payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Canonical site URL
    pub home_url: String,

    /// Site name
    pub name: String,

    /// Sender address for notification emails
    pub admin_email: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            home_url: String::from("http://localhost"),
            name: String::from("Startle"),
            admin_email: String::from("admin@localhost"),
        }
    }
}

/// Settings record location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Path of the JSON settings record
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/startle_settings.json"),
        }
    }
}

/// SMTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP server host
    pub host: String,

    /// SMTP server port
    pub port: u16,

    /// SMTP username
    pub username: Option<String>,

    /// SMTP password
    pub password: Option<String>,

    /// Use STARTTLS
    pub use_tls: bool,

    /// Connection and command timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 25,
            username: None,
            password: None,
            use_tls: false,
            timeout_secs: 30,
        }
    }
}

/// Chat webhook delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Payload template overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Handlebars file replacing the built-in email body
    pub email: Option<PathBuf>,
}

/// Suppression store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionBackend {
    /// Process-local store
    #[default]
    Memory,
    /// Shared Redis store
    Redis,
}

/// Rate-limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Suppression window in seconds
    pub window_secs: u64,

    /// Store backend
    pub backend: SuppressionBackend,

    /// Redis URL (e.g., redis://localhost:6379)
    pub redis_url: String,

    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600, // 1 hour
            backend: SuppressionBackend::Memory,
            redis_url: String::from("redis://localhost:6379"),
            key_prefix: String::from("startle"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = match std::env::var("STARTLE_RATE_LIMIT_BACKEND").ok().as_deref() {
            Some("redis") => SuppressionBackend::Redis,
            Some("memory") | None => SuppressionBackend::Memory,
            Some(other) => anyhow::bail!("Unknown rate limit backend: {other}"),
        };

        Ok(Self {
            site: SiteConfig {
                home_url: std::env::var("STARTLE_HOME_URL").unwrap_or(defaults.site.home_url),
                name: std::env::var("STARTLE_SITE_NAME").unwrap_or(defaults.site.name),
                admin_email: std::env::var("STARTLE_ADMIN_EMAIL")
                    .unwrap_or(defaults.site.admin_email),
            },
            settings: SettingsConfig {
                path: std::env::var("STARTLE_SETTINGS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.settings.path),
            },
            smtp: SmtpConfig {
                host: std::env::var("STARTLE_SMTP_HOST").unwrap_or(defaults.smtp.host),
                port: env_parse("STARTLE_SMTP_PORT").unwrap_or(defaults.smtp.port),
                username: std::env::var("STARTLE_SMTP_USERNAME").ok(),
                password: std::env::var("STARTLE_SMTP_PASSWORD").ok(),
                use_tls: env_parse("STARTLE_SMTP_TLS").unwrap_or(defaults.smtp.use_tls),
                timeout_secs: env_parse("STARTLE_SMTP_TIMEOUT")
                    .unwrap_or(defaults.smtp.timeout_secs),
            },
            webhook: WebhookConfig {
                timeout_secs: env_parse("STARTLE_WEBHOOK_TIMEOUT")
                    .unwrap_or(defaults.webhook.timeout_secs),
            },
            templates: TemplateConfig {
                email: std::env::var("STARTLE_EMAIL_TEMPLATE")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
                    .or(defaults.templates.email),
            },
            rate_limit: RateLimitConfig {
                window_secs: env_parse("STARTLE_RATE_LIMIT_WINDOW")
                    .unwrap_or(defaults.rate_limit.window_secs),
                backend,
                redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.rate_limit.redis_url),
                key_prefix: std::env::var("STARTLE_KEY_PREFIX")
                    .unwrap_or(defaults.rate_limit.key_prefix),
            },
            logging: LoggingConfig {
                level: std::env::var("STARTLE_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: std::env::var("STARTLE_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.site.home_url.is_empty() {
            anyhow::bail!("site.home_url must not be empty");
        }

        let parsed = url::Url::parse(&self.site.home_url)
            .with_context(|| format!("site.home_url is not a valid URL: {}", self.site.home_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("site.home_url must start with http:// or https://");
        }

        if self.site.admin_email.is_empty() {
            anyhow::bail!("site.admin_email must not be empty");
        }

        if let Some(path) = &self.templates.email {
            if !path.is_file() {
                anyhow::bail!("templates.email does not exist: {}", path.display());
            }
        }

        if self.smtp.timeout_secs == 0 {
            anyhow::bail!("smtp.timeout_secs must be greater than 0");
        }

        if self.webhook.timeout_secs == 0 {
            anyhow::bail!("webhook.timeout_secs must be greater than 0");
        }

        if self.rate_limit.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be greater than 0");
        }

        if self.rate_limit.window_secs > MAX_WINDOW_SECS {
            anyhow::bail!(
                "rate_limit.window_secs must be at most {MAX_WINDOW_SECS}, got {}",
                self.rate_limit.window_secs
            );
        }

        Ok(())
    }

    /// Get webhook timeout as Duration
    #[must_use]
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook.timeout_secs)
    }

    /// Get SMTP timeout as Duration
    #[must_use]
    pub fn smtp_timeout(&self) -> Duration {
        Duration::from_secs(self.smtp.timeout_secs)
    }

    /// Get the suppression window as Duration
    #[must_use]
    pub fn suppression_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_home_url() {
        let mut config = Config::default();
        config.site.home_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.site.home_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.rate_limit.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_email_template_rejected() {
        let mut config = Config::default();
        config.templates.email = Some(PathBuf::from("/nonexistent/alert.hbs"));
        assert!(config.validate().is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        config.templates.email = Some(file.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_upper_bound() {
        let mut config = Config::default();
        config.rate_limit.window_secs = MAX_WINDOW_SECS;
        assert!(config.validate().is_ok());

        config.rate_limit.window_secs = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at most"));
    }

    #[test]
    fn test_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.webhook_timeout(), Duration::from_secs(30));
        assert_eq!(config.smtp_timeout(), Duration::from_secs(30));
        assert_eq!(config.suppression_window(), Duration::from_secs(3600));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[site]
home_url = "https://example.com"
name = "Example"

[rate_limit]
backend = "redis"
window_secs = 600
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.site.home_url, "https://example.com");
        assert_eq!(config.site.admin_email, "admin@localhost");
        assert_eq!(config.rate_limit.backend, SuppressionBackend::Redis);
        assert_eq!(config.rate_limit.window_secs, 600);
        assert_eq!(config.webhook.timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("STARTLE_HOME_URL", "https://env.example.com");
        std::env::set_var("STARTLE_RATE_LIMIT_WINDOW", "120");
        std::env::set_var("STARTLE_EMAIL_TEMPLATE", "/etc/startle/alert.hbs");
        let config = Config::from_env().unwrap();
        std::env::remove_var("STARTLE_HOME_URL");
        std::env::remove_var("STARTLE_RATE_LIMIT_WINDOW");
        std::env::remove_var("STARTLE_EMAIL_TEMPLATE");

        assert_eq!(config.site.home_url, "https://env.example.com");
        assert_eq!(config.rate_limit.window_secs, 120);
        assert_eq!(
            config.templates.email.as_deref(),
            Some(Path::new("/etc/startle/alert.hbs"))
        );
        assert_eq!(config.rate_limit.backend, SuppressionBackend::Memory);
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_backend() {
        std::env::set_var("STARTLE_RATE_LIMIT_BACKEND", "memcached");
        let result = Config::from_env();
        std::env::remove_var("STARTLE_RATE_LIMIT_BACKEND");
        assert!(result.is_err());
    }
}
