//! Error scenario integration tests
//!
//! Tests failure modes of delivery and storage:
//! 1. Webhook errors and timeouts
//! 2. Mail transport failures
//! 3. Broken email template
//! 4. Broken suppression store
//! 5. Unreadable settings

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use startle::error::{Error, Result};
use startle::models::{ErrorRecord, RequestContext};
use startle::notifications::channels::webhook::build_client;
use startle::notifications::{Outcome, ShutdownHandler};
use startle::policy::{NotificationPolicy, SuppressReason};
use startle::render::{EmailRenderer, NotificationRenderer};
use startle::settings::{FileSettingsStore, MemorySettingsStore, SettingsStore};
use startle::severity::Severity;
use startle::suppression::{MemorySuppressionStore, SuppressionStore};

use crate::common::{build_handler, test_settings, test_site, RecordingTransport};

fn fatal() -> ErrorRecord {
    ErrorRecord::with_severity(Severity::Error, "boom", "/a/b.php", 10)
}

// ============================================================================
// Delivery failures
// ============================================================================

#[tokio::test]
async fn test_webhook_failure_does_not_block_email() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&server)
        .await;

    let mail = Arc::new(RecordingTransport::default());
    let handler = build_handler(
        Some(test_settings(Some(&server.uri()))),
        mail.clone(),
        Duration::from_secs(5),
    );

    let outcome = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;

    let chat = outcome.status("chat").unwrap();
    assert!(!chat.success);
    assert!(chat.attempted);
    assert!(chat.message.as_deref().unwrap().contains("500"));

    assert!(outcome.status("email").unwrap().success);
    assert_eq!(mail.count(), 1);
}

#[tokio::test]
async fn test_webhook_timeout_is_bounded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let mail = Arc::new(RecordingTransport::default());
    let handler = build_handler(
        Some(test_settings(Some(&server.uri()))),
        mail.clone(),
        Duration::from_millis(200),
    );

    let started = std::time::Instant::now();
    let outcome = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!outcome.status("chat").unwrap().success);
    assert!(outcome.status("email").unwrap().success);
}

#[tokio::test]
async fn test_mail_failure_does_not_block_webhook() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mail = Arc::new(RecordingTransport::failing());
    let handler = build_handler(
        Some(test_settings(Some(&server.uri()))),
        mail,
        Duration::from_secs(5),
    );

    let outcome = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;
    assert!(!outcome.status("email").unwrap().success);
    assert!(outcome.status("chat").unwrap().success);
}

#[tokio::test]
async fn test_failed_delivery_still_rate_limits() {
    let mail = Arc::new(RecordingTransport::failing());
    let handler = build_handler(Some(test_settings(None)), mail, Duration::from_secs(5));

    let first = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;
    assert!(!first.status("email").unwrap().success);

    let second = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;
    assert!(matches!(second, Outcome::Suppressed(SuppressReason::RateLimited)));
}

#[tokio::test]
async fn test_broken_email_template_still_posts_chat() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let template = dir.path().join("alert.hbs");
    std::fs::write(&template, "<p>{{#missing_helper}}{{message}}{{/missing_helper}}</p>").unwrap();

    let mail = Arc::new(RecordingTransport::default());
    let renderer =
        NotificationRenderer::with_email_renderer(EmailRenderer::with_template(&template).unwrap());
    let handler = build_handler(
        Some(test_settings(Some(&server.uri()))),
        mail.clone(),
        Duration::from_secs(5),
    )
    .with_renderer(renderer);

    let outcome = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;

    let email = outcome.status("email").unwrap();
    assert!(!email.success);
    assert!(!email.attempted);
    assert_eq!(mail.count(), 0);

    let chat = outcome.status("chat").unwrap();
    assert!(chat.success);
    assert!(chat.attempted);
}

// ============================================================================
// Store failures
// ============================================================================

struct UnavailableStore;

#[async_trait]
impl SuppressionStore for UnavailableStore {
    async fn is_suppressed(&self, _key: &str) -> Result<bool> {
        Err(Error::suppression("connection refused"))
    }

    async fn try_suppress(&self, _key: &str, _ttl: Duration) -> Result<bool> {
        Err(Error::suppression("connection refused"))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[tokio::test]
async fn test_broken_suppression_store_still_notifies() {
    let mail = Arc::new(RecordingTransport::default());
    let handler = ShutdownHandler::new(
        test_site(),
        Arc::new(MemorySettingsStore::with_settings(test_settings(None))),
        NotificationPolicy::new(Arc::new(UnavailableStore)),
        mail.clone(),
        build_client(Duration::from_secs(5)).unwrap(),
    )
    .unwrap();

    for _ in 0..2 {
        let outcome = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;
        assert!(!outcome.is_suppressed());
    }
    assert_eq!(mail.count(), 2);
}

#[tokio::test]
async fn test_corrupt_settings_file_is_treated_as_unconfigured() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{not json").unwrap();

    let mail = Arc::new(RecordingTransport::default());
    let handler = ShutdownHandler::new(
        test_site(),
        Arc::new(FileSettingsStore::new(&path)),
        NotificationPolicy::new(Arc::new(MemorySuppressionStore::new())),
        mail.clone(),
        build_client(Duration::from_secs(5)).unwrap(),
    )
    .unwrap();

    let outcome = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;
    assert!(matches!(outcome, Outcome::Suppressed(SuppressReason::Unconfigured)));
    assert_eq!(mail.count(), 0);
}

#[tokio::test]
async fn test_settings_file_round_trip_drives_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let store = FileSettingsStore::new(&path);
    store.save(&test_settings(None)).await.unwrap();

    let mail = Arc::new(RecordingTransport::default());
    let handler = ShutdownHandler::new(
        test_site(),
        Arc::new(store),
        NotificationPolicy::new(Arc::new(MemorySuppressionStore::new())),
        mail.clone(),
        build_client(Duration::from_secs(5)).unwrap(),
    )
    .unwrap();

    let outcome = handler.handle(Some(fatal()), RequestContext::new("/"), false).await;
    assert!(outcome.status("email").unwrap().success);
    assert_eq!(mail.sent()[0].to, vec!["ops@example.com"]);
}
