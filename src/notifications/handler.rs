//! Shutdown handler: the single-pass error-to-notification pipeline

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

use super::channels::email::{EmailChannel, MailTransport, SmtpMailTransport};
use super::channels::webhook::{build_client, WebhookChannel};
use super::channels::{Channel, DeliveryStatus};
use crate::config::{Config, SiteConfig, SuppressionBackend};
use crate::error::{Error, Result};
use crate::models::{ErrorRecord, RequestContext, SiteContext};
use crate::policy::{NotificationPolicy, SuppressReason, Verdict};
use crate::render::{EmailRenderer, NotificationRenderer};
use crate::settings::{FileSettingsStore, NotificationSettings, SettingsStore};
use crate::suppression::{MemorySuppressionStore, RedisSuppressionStore, SuppressionStore};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Idle,
    Evaluating,
    Suppressed(SuppressReason),
    Dispatching,
    Done,
}

impl HandlerState {
    /// Whether `next` may follow this state
    pub fn can_advance_to(self, next: HandlerState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Evaluating)
                | (Self::Evaluating, Self::Suppressed(_) | Self::Dispatching)
                | (Self::Suppressed(_) | Self::Dispatching, Self::Done)
        )
    }
}

/// State of a single pass; each call to [`ShutdownHandler::run`] owns one
struct Pass {
    state: HandlerState,
}

impl Pass {
    fn new() -> Self {
        Self {
            state: HandlerState::Idle,
        }
    }

    fn advance(&mut self, next: HandlerState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        tracing::debug!(from = %self.state, to = %next, "Handler state transition");
        self.state = next;
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Evaluating => write!(f, "evaluating"),
            Self::Suppressed(reason) => write!(f, "suppressed({reason})"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Result of one pipeline pass
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Policy declined; nothing was sent
    Suppressed(SuppressReason),
    /// One status per selected channel
    Dispatched(Vec<DeliveryStatus>),
}

impl Outcome {
    /// Delivery statuses, empty when suppressed
    pub fn statuses(&self) -> &[DeliveryStatus] {
        match self {
            Self::Suppressed(_) => &[],
            Self::Dispatched(statuses) => statuses,
        }
    }

    /// Status for a named channel
    pub fn status(&self, channel: &str) -> Option<&DeliveryStatus> {
        self.statuses().iter().find(|s| s.channel == channel)
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed(_))
    }

    /// States the pass went through, `Idle` to `Done`
    pub fn path(&self) -> [HandlerState; 4] {
        let branch = match self {
            Self::Suppressed(reason) => HandlerState::Suppressed(*reason),
            Self::Dispatched(_) => HandlerState::Dispatching,
        };
        [
            HandlerState::Idle,
            HandlerState::Evaluating,
            branch,
            HandlerState::Done,
        ]
    }
}

/// Which channels a pass delivers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelection {
    pub email: bool,
    pub chat: bool,
}

impl ChannelSelection {
    pub const ALL: Self = Self {
        email: true,
        chat: true,
    };
    pub const EMAIL: Self = Self {
        email: true,
        chat: false,
    };
    pub const CHAT: Self = Self {
        email: false,
        chat: true,
    };
}

/// Entry point invoked at process termination
///
/// Captured fault → policy verdict → render once → fan out to every selected
/// channel. Channel failures are logged and reported in the [`Outcome`];
/// nothing here returns an error to the caller. Passes share no state, so
/// overlapping calls are independent.
pub struct ShutdownHandler {
    site: SiteConfig,
    settings: Arc<dyn SettingsStore>,
    policy: NotificationPolicy,
    renderer: NotificationRenderer<'static>,
    mail: Arc<dyn MailTransport>,
    http: reqwest::Client,
}

impl ShutdownHandler {
    /// Create a handler from its collaborators
    pub fn new(
        site: SiteConfig,
        settings: Arc<dyn SettingsStore>,
        policy: NotificationPolicy,
        mail: Arc<dyn MailTransport>,
        http: reqwest::Client,
    ) -> Result<Self> {
        Ok(Self {
            site,
            settings,
            policy,
            renderer: NotificationRenderer::new()?,
            mail,
            http,
        })
    }

    /// Replace the payload renderer
    pub fn with_renderer(mut self, renderer: NotificationRenderer<'static>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Wire a handler from process configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn SuppressionStore> = match config.rate_limit.backend {
            SuppressionBackend::Memory => Arc::new(MemorySuppressionStore::new()),
            SuppressionBackend::Redis => {
                Arc::new(RedisSuppressionStore::new(&config.rate_limit).await?)
            }
        };

        let policy = NotificationPolicy::new(store)
            .with_window(config.suppression_window())
            .with_key_prefix(config.rate_limit.key_prefix.clone());

        let mail = SmtpMailTransport::new(&config.smtp, config.smtp_timeout())
            .map_err(|e| Error::with_source("Failed to create mail transport", e))?;
        let http = build_client(config.webhook_timeout())
            .map_err(|e| Error::with_source("Failed to create HTTP client", e))?;

        let handler = Self::new(
            config.site.clone(),
            Arc::new(FileSettingsStore::new(config.settings.path.clone())),
            policy,
            Arc::new(mail),
            http,
        )?;

        match &config.templates.email {
            Some(path) => {
                tracing::info!(template = %path.display(), "Using custom email template");
                let email = EmailRenderer::with_template(path)?;
                Ok(handler.with_renderer(NotificationRenderer::with_email_renderer(email)))
            }
            None => Ok(handler),
        }
    }

    /// Site identity
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Load the settings record; failures are logged and read as absent
    pub async fn load_settings(&self) -> Option<NotificationSettings> {
        match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load notification settings");
                None
            }
        }
    }

    /// Handle the last fault of the process on every channel
    pub async fn handle(
        &self,
        error: Option<ErrorRecord>,
        request: RequestContext,
        is_test: bool,
    ) -> Outcome {
        self.run(error, request, is_test, ChannelSelection::ALL).await
    }

    /// Run one pass of the pipeline on the selected channels
    pub async fn run(
        &self,
        error: Option<ErrorRecord>,
        request: RequestContext,
        is_test: bool,
        selection: ChannelSelection,
    ) -> Outcome {
        let mut pass = Pass::new();
        pass.advance(HandlerState::Evaluating);

        let settings = self.load_settings().await;
        let verdict = self
            .policy
            .evaluate(error.as_ref(), settings.as_ref(), is_test)
            .await;

        let error = match (verdict, error) {
            (Verdict::Allow, Some(error)) => error,
            (Verdict::Suppress(reason), _) => {
                tracing::debug!(reason = %reason, "Notification suppressed");
                pass.advance(HandlerState::Suppressed(reason));
                pass.advance(HandlerState::Done);
                return Outcome::Suppressed(reason);
            }
            (Verdict::Allow, None) => {
                pass.advance(HandlerState::Suppressed(SuppressReason::NoError));
                pass.advance(HandlerState::Done);
                return Outcome::Suppressed(SuppressReason::NoError);
            }
        };

        pass.advance(HandlerState::Dispatching);

        let settings = settings.unwrap_or_else(NotificationSettings::empty);
        let ctx = SiteContext::new(&self.site, request);
        let statuses = self.dispatch(&error, &ctx, &settings, is_test, selection).await;

        pass.advance(HandlerState::Done);
        Outcome::Dispatched(statuses)
    }

    fn channels(
        &self,
        settings: &NotificationSettings,
        selection: ChannelSelection,
    ) -> Vec<Box<dyn Channel>> {
        let mut channels: Vec<Box<dyn Channel>> = Vec::new();

        if selection.email {
            channels.push(Box::new(EmailChannel::new(
                self.mail.clone(),
                self.site.name.clone(),
                self.site.admin_email.clone(),
                settings.recipients(),
            )));
        }

        if selection.chat {
            channels.push(Box::new(WebhookChannel::new(
                self.http.clone(),
                settings.webhook_url(),
            )));
        }

        channels
    }

    async fn dispatch(
        &self,
        error: &ErrorRecord,
        ctx: &SiteContext,
        settings: &NotificationSettings,
        is_test: bool,
        selection: ChannelSelection,
    ) -> Vec<DeliveryStatus> {
        let channels = self.channels(settings, selection);

        let rendered = self.renderer.render(error, ctx);

        let span = tracing::info_span!(
            "notification",
            id = %rendered.id,
            level = %error.classification(),
            test = is_test,
        );

        async {
            tracing::info!(
                file = %error.file_basename(),
                line = error.line,
                channels = channels.len(),
                "Dispatching notification"
            );

            join_all(channels.iter().map(|channel| {
                let rendered = &rendered;
                async move {
                    match channel.send(rendered).await {
                        Ok(status) => status,
                        Err(e) => {
                            tracing::error!(
                                channel = channel.name(),
                                error = %e,
                                "Notification delivery failed"
                            );
                            DeliveryStatus::from_error(channel.name(), &e)
                        }
                    }
                }
            }))
            .await
        }
        .instrument(span)
        .await
    }
}
