//! Pipeline integration tests
//!
//! Drives the shutdown hook end to end:
//! 1. Fault recorded in the last-error slot
//! 2. Policy verdict against stored settings
//! 3. Email to the recording transport
//! 4. Chat payload to a mock webhook

use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use startle::models::{ErrorRecord, RequestContext};
use startle::notifications::{Actions, LastErrorSlot, Outcome, ShutdownHook, TestAction};
use startle::policy::SuppressReason;
use startle::settings::NotificationSettings;
use startle::severity::Severity;

use super::fixtures::{checkout_request, fatal_with_markup, filesystem_noise, FATAL_RECORD_JSON};
use crate::common::{build_handler, test_settings, RecordingTransport};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn mount_ok(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(expected)
        .mount(server)
        .await;
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_fatal_error_reaches_both_channels() {
    let server = MockServer::start().await;
    mount_ok(&server, 1).await;

    let mail = Arc::new(RecordingTransport::default());
    let webhook = format!("{}/hook", server.uri());
    let handler = build_handler(Some(test_settings(Some(&webhook))), mail.clone(), TIMEOUT);

    let slot = LastErrorSlot::new();
    let hook = ShutdownHook::register(Arc::new(handler), slot.clone());

    let record: ErrorRecord = serde_json::from_str(FATAL_RECORD_JSON).unwrap();
    slot.record(record);

    let outcome = hook.fire(checkout_request()).await.unwrap();
    assert!(outcome.status("email").unwrap().success);
    assert!(outcome.status("chat").unwrap().success);

    let sent = mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Startle notification for https://shop.example.com");
    assert_eq!(sent[0].from_header(), "Example Shop <admin@example.com>");
    assert_eq!(sent[0].to, vec!["ops@example.com"]);
    assert!(sent[0].html_body.contains("E_ERROR"));
    assert!(sent[0].html_body.contains("checkout.php"));
    assert!(sent[0].html_body.contains("Jo Doe"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let blocks = body["blocks"].as_array().unwrap();
    assert_eq!(blocks[0]["type"], "header");
    assert_eq!(blocks[0]["text"]["text"], "💀 Fatal Error 💀");
    assert_eq!(blocks[1]["fields"][0]["text"], "*Site:*\nshop.example.com");
    assert_eq!(blocks[2]["fields"][0]["text"], "*Error Level:*\nE_ERROR");
    assert_eq!(
        blocks[3]["text"]["text"],
        "*Error Message:*\n```Uncaught Error: Call to undefined function wc_get_order()```"
    );
    assert_eq!(blocks[4]["fields"][0]["text"], "*File:*\ncheckout.php");
    assert_eq!(blocks[4]["fields"][1]["text"], "*Line:*\n212");
    assert_eq!(blocks[5]["elements"][0]["text"], "🔗 /checkout?step=2");
}

#[tokio::test]
async fn test_email_escapes_but_chat_does_not() {
    let server = MockServer::start().await;
    mount_ok(&server, 1).await;

    let mail = Arc::new(RecordingTransport::default());
    let webhook = format!("{}/hook", server.uri());
    let handler = build_handler(Some(test_settings(Some(&webhook))), mail.clone(), TIMEOUT);

    handler
        .handle(Some(fatal_with_markup()), RequestContext::new("/"), false)
        .await;

    let html = &mail.sent()[0].html_body;
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("<script>alert(1)</script>"));
}

// ============================================================================
// Gating
// ============================================================================

#[tokio::test]
async fn test_same_message_notifies_once_per_window() {
    let server = MockServer::start().await;
    mount_ok(&server, 2).await;

    let mail = Arc::new(RecordingTransport::default());
    let webhook = format!("{}/hook", server.uri());
    let handler = build_handler(Some(test_settings(Some(&webhook))), mail.clone(), TIMEOUT);

    let error = ErrorRecord::with_severity(Severity::Error, "boom", "/a/b.php", 10);
    let first = handler.handle(Some(error), RequestContext::new("/"), false).await;
    assert!(!first.is_suppressed());

    // Same message, different location
    let moved = ErrorRecord::with_severity(Severity::Error, "boom", "/c/d.php", 99);
    let second = handler.handle(Some(moved), RequestContext::new("/"), false).await;
    assert!(matches!(second, Outcome::Suppressed(SuppressReason::RateLimited)));

    let other = ErrorRecord::with_severity(Severity::Error, "different", "/a/b.php", 10);
    let third = handler.handle(Some(other), RequestContext::new("/"), false).await;
    assert!(!third.is_suppressed());

    assert_eq!(mail.count(), 2);
}

#[tokio::test]
async fn test_disabled_level_sends_nothing() {
    let mail = Arc::new(RecordingTransport::default());
    let handler = build_handler(Some(test_settings(None)), mail.clone(), TIMEOUT);

    let warning = ErrorRecord::with_severity(Severity::Warning, "careful", "/a.php", 1);
    let outcome = handler.handle(Some(warning), RequestContext::new("/"), false).await;

    assert!(matches!(outcome, Outcome::Suppressed(SuppressReason::LevelDisabled)));
    assert_eq!(mail.count(), 0);
}

#[tokio::test]
async fn test_unconfigured_settings_send_nothing() {
    let mail = Arc::new(RecordingTransport::default());
    let handler = build_handler(Some(NotificationSettings::empty()), mail.clone(), TIMEOUT);

    let outcome = handler
        .handle(Some(fatal_with_markup()), RequestContext::new("/"), false)
        .await;
    assert!(matches!(outcome, Outcome::Suppressed(SuppressReason::Unconfigured)));
    assert_eq!(mail.count(), 0);
}

#[tokio::test]
async fn test_filesystem_noise_is_ignored_even_for_tests() {
    let mail = Arc::new(RecordingTransport::default());
    let handler = build_handler(Some(test_settings(None)), mail.clone(), TIMEOUT);

    let real = handler
        .handle(Some(filesystem_noise()), RequestContext::new("/"), false)
        .await;
    assert!(matches!(real, Outcome::Suppressed(SuppressReason::KnownNoise)));

    let test = handler
        .handle(Some(filesystem_noise()), RequestContext::new("/"), true)
        .await;
    assert!(matches!(test, Outcome::Suppressed(SuppressReason::KnownNoise)));
    assert_eq!(mail.count(), 0);
}

#[tokio::test]
async fn test_test_invocation_ignores_rate_limit() {
    let mail = Arc::new(RecordingTransport::default());
    let handler = build_handler(Some(test_settings(None)), mail.clone(), TIMEOUT);

    let error = ErrorRecord::with_severity(Severity::Error, "boom", "/a/b.php", 10);
    handler
        .handle(Some(error.clone()), RequestContext::new("/"), false)
        .await;
    let again = handler
        .handle(Some(error.clone()), RequestContext::new("/"), true)
        .await;
    assert!(!again.is_suppressed());

    // Test sends never set the flag, so a fresh message stays allowed
    let fresh = ErrorRecord::with_severity(Severity::Error, "fresh", "/a/b.php", 10);
    handler
        .handle(Some(fresh.clone()), RequestContext::new("/"), true)
        .await;
    let real = handler.handle(Some(fresh), RequestContext::new("/"), false).await;
    assert!(!real.is_suppressed());

    assert_eq!(mail.count(), 4);
}

// ============================================================================
// Manual triggers
// ============================================================================

#[tokio::test]
async fn test_chat_action_posts_synthetic_error() {
    let server = MockServer::start().await;
    mount_ok(&server, 1).await;

    let mail = Arc::new(RecordingTransport::default());
    let webhook = format!("{}/hook", server.uri());
    let handler = build_handler(Some(test_settings(Some(&webhook))), mail.clone(), TIMEOUT);

    let response = Actions::new(Arc::new(handler))
        .dispatch(TestAction::Chat, RequestContext::new("/wp-admin"))
        .await;

    assert!(response.success);
    assert_eq!(response.message(), "Test notification sent successfully");
    assert_eq!(mail.count(), 0);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("This is a test notification from Startle"));
}
