//! Test fixtures for integration tests

use startle::models::{ErrorRecord, RequestContext, SiteUser};
use startle::severity::Severity;

/// Record as the host dumps it on a fatal error
pub const FATAL_RECORD_JSON: &str = r#"{
    "type": 1,
    "message": "Uncaught Error: Call to undefined function wc_get_order()",
    "file": "/var/www/html/wp-content/plugins/shop/checkout.php",
    "line": 212
}"#;

/// A fatal error with markup in the message
pub fn fatal_with_markup() -> ErrorRecord {
    ErrorRecord::with_severity(
        Severity::Error,
        "Unexpected <script>alert(1)</script> in template",
        "/var/www/html/theme/header.php",
        42,
    )
}

/// A warning from a failed filesystem call
pub fn filesystem_noise() -> ErrorRecord {
    ErrorRecord::with_severity(
        Severity::Warning,
        "unlink(/tmp/cache/abc): No such file or directory",
        "/var/www/html/cache.php",
        7,
    )
}

/// A request made by a logged-in user
pub fn checkout_request() -> RequestContext {
    RequestContext::new("/checkout?step=2")
        .with_referrer("https://shop.example.com/cart")
        .with_user(SiteUser {
            id: 17,
            display_name: "Jo Doe".to_string(),
            email: "jo@example.com".to_string(),
        })
}
