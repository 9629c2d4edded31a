//! Email notification channel
//!
//! Sends the rendered HTML document to every configured recipient in one
//! message. The underlying transport is behind [`MailTransport`] so the
//! pipeline never depends on a live SMTP server.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::config::SmtpConfig;
use crate::render::RenderedNotification;

/// An outgoing HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Display name of the sender
    pub from_name: String,
    /// Sender address
    pub from_address: String,
    /// Recipient addresses
    pub to: Vec<String>,
    pub subject: String,
    /// HTML body, UTF-8
    pub html_body: String,
}

impl MailMessage {
    /// Value of the `From:` header
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_address)
    }
}

/// Mail delivery primitive
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver a message
    async fn send(&self, message: &MailMessage) -> ChannelResult<()>;
}

/// SMTP transport backed by lettre
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Build a transport from configuration
    ///
    /// `timeout` bounds each SMTP command; delivery is never retried.
    pub fn new(config: &SmtpConfig, timeout: Duration) -> ChannelResult<Self> {
        if config.host.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "SMTP host cannot be empty".to_string(),
            ));
        }

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                ChannelError::InvalidConfig(format!("Failed to create SMTP transport: {e}"))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(timeout));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }

    fn build_message(message: &MailMessage) -> ChannelResult<Message> {
        let from_address: Address = message
            .from_address
            .parse()
            .map_err(|e| ChannelError::InvalidAddress(format!("{}: {e}", message.from_address)))?;

        let mut builder = Message::builder()
            .from(Mailbox::new(Some(message.from_name.clone()), from_address))
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);

        let mut valid = 0;
        for to in &message.to {
            match to.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    valid += 1;
                }
                Err(e) => tracing::warn!(address = %to, error = %e, "Skipping invalid recipient"),
            }
        }

        if valid == 0 {
            return Err(ChannelError::InvalidAddress(message.to.join(", ")));
        }

        builder
            .body(message.html_body.clone())
            .map_err(|e| ChannelError::Transport(format!("Failed to build email: {e}")))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &MailMessage) -> ChannelResult<()> {
        let email = Self::build_message(message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Email notification channel
pub struct EmailChannel {
    transport: Arc<dyn MailTransport>,
    from_name: String,
    from_address: String,
    recipients: Vec<String>,
}

impl EmailChannel {
    /// Create a channel for a deduplicated recipient list
    pub fn new(
        transport: Arc<dyn MailTransport>,
        from_name: impl Into<String>,
        from_address: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            transport,
            from_name: from_name.into(),
            from_address: from_address.into(),
            recipients,
        }
    }

    /// Configured recipients
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Send one HTML email to every recipient
    pub async fn deliver(&self, subject: &str, html_body: &str) -> ChannelResult<DeliveryStatus> {
        if self.recipients.is_empty() {
            tracing::warn!("No notification emails configured");
            return Err(ChannelError::NoRecipients);
        }

        let message = MailMessage {
            from_name: self.from_name.clone(),
            from_address: self.from_address.clone(),
            to: self.recipients.clone(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        };

        self.transport.send(&message).await?;

        tracing::info!(recipients = self.recipients.len(), "Email notification sent");

        Ok(DeliveryStatus::success_with_message(
            self.name(),
            format!("Sent to {}", self.recipients.join(", ")),
        ))
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, notification: &RenderedNotification) -> ChannelResult<DeliveryStatus> {
        let html_body = notification
            .html_body
            .as_deref()
            .map_err(|e| ChannelError::Render(e.clone()))?;
        self.deliver(&notification.subject, html_body).await
    }
}
