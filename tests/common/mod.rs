//! Common test utilities

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use startle::config::SiteConfig;
use startle::notifications::channels::email::{MailMessage, MailTransport};
use startle::notifications::channels::webhook::build_client;
use startle::notifications::channels::{ChannelError, ChannelResult};
use startle::notifications::ShutdownHandler;
use startle::policy::NotificationPolicy;
use startle::settings::{MemorySettingsStore, NotificationSettings};
use startle::suppression::MemorySuppressionStore;

/// Mail transport that records every message
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingTransport {
    /// Transport whose every send fails
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &MailMessage) -> ChannelResult<()> {
        if self.fail {
            return Err(ChannelError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Site identity used across the integration tests
pub fn test_site() -> SiteConfig {
    SiteConfig {
        home_url: "https://shop.example.com".to_string(),
        name: "Example Shop".to_string(),
        admin_email: "admin@example.com".to_string(),
    }
}

/// Settings with one recipient, the default levels and an optional webhook
pub fn test_settings(webhook: Option<&str>) -> NotificationSettings {
    let settings = NotificationSettings::default().with_emails("ops@example.com");
    match webhook {
        Some(url) => settings.with_webhook(url),
        None => settings,
    }
}

/// Handler wired to in-memory stores and the given transport
pub fn build_handler(
    settings: Option<NotificationSettings>,
    mail: Arc<RecordingTransport>,
    timeout: Duration,
) -> ShutdownHandler {
    let store = match settings {
        Some(settings) => MemorySettingsStore::with_settings(settings),
        None => MemorySettingsStore::new(),
    };

    ShutdownHandler::new(
        test_site(),
        Arc::new(store),
        NotificationPolicy::new(Arc::new(MemorySuppressionStore::new())),
        mail,
        build_client(timeout).unwrap(),
    )
    .unwrap()
}
