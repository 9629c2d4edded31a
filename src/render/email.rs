//! HTML email rendering
//!
//! The document is produced from a Handlebars template. Every interpolated
//! value goes through the registered HTML escape function, so message text,
//! request URI, referrer and user fields can never inject markup.

use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::models::{ErrorRecord, SiteContext};

/// Default email template
const DEFAULT_TEMPLATE: &str = include_str!("../../templates/alert_email.hbs");

const TEMPLATE_NAME: &str = "alert_email";

/// Referrer shown when the request carried none
pub const UNKNOWN_REFERRER: &str = "Unknown";

#[derive(Debug, Serialize)]
struct UserTemplateData {
    id: u64,
    display_name: String,
    email: String,
}

/// Template data for rendering
#[derive(Debug, Serialize)]
struct EmailTemplateData {
    error_level: &'static str,
    message: String,
    file: String,
    line: u32,
    request_uri: String,
    referrer: String,
    user: Option<UserTemplateData>,
    site_url: String,
    site_name: String,
    sent_at: String,
}

impl EmailTemplateData {
    fn new(error: &ErrorRecord, ctx: &SiteContext) -> Self {
        Self {
            error_level: error.classification().label(),
            message: error.message.clone(),
            file: error.file_basename().to_string(),
            line: error.line,
            request_uri: ctx.request.request_uri.clone(),
            referrer: ctx
                .request
                .referrer
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| UNKNOWN_REFERRER.to_string()),
            user: ctx.request.user.as_ref().map(|u| UserTemplateData {
                id: u.id,
                display_name: u.display_name.clone(),
                email: u.email.clone(),
            }),
            site_url: ctx.home_url.clone(),
            site_name: ctx.display_host().to_string(),
            sent_at: ctx.timestamp.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        }
    }
}

/// Renders the HTML email body
pub struct EmailRenderer<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> EmailRenderer<'a> {
    /// Create a renderer with the built-in template
    pub fn new() -> Result<Self> {
        let mut handlebars = Self::engine();
        handlebars.register_template_string(TEMPLATE_NAME, DEFAULT_TEMPLATE)?;
        Ok(Self { handlebars })
    }

    /// Create a renderer with a custom template file
    pub fn with_template(template_path: &Path) -> Result<Self> {
        let mut handlebars = Self::engine();
        handlebars.register_template_file(TEMPLATE_NAME, template_path)?;
        Ok(Self { handlebars })
    }

    fn engine() -> Handlebars<'a> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(|s| html_escape::encode_safe(s).into_owned());
        handlebars
    }

    /// Subject line for a notification
    pub fn subject(&self, ctx: &SiteContext) -> String {
        format!("Startle notification for {}", ctx.home_url)
    }

    /// Render the HTML body
    pub fn render(&self, error: &ErrorRecord, ctx: &SiteContext) -> Result<String> {
        let data = EmailTemplateData::new(error, ctx);
        Ok(self.handlebars.render(TEMPLATE_NAME, &data)?)
    }
}
