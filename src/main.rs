use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use startle::config::Config;
use startle::models::{ErrorRecord, RequestContext};
use startle::notifications::{
    install_panic_capture, Actions, LastErrorSlot, Outcome, ShutdownHandler, ShutdownHook,
    TestAction,
};
use startle::settings::{FileSettingsStore, NotificationSettings, SettingsStore};
use startle::severity::REPORTABLE_LEVELS;

#[derive(Parser)]
#[command(
    name = "startle",
    version,
    about = "Fatal error notifications by email and chat webhook",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report a fault as the last error of the process
    Notify {
        /// Severity code
        #[arg(long, default_value = "1")]
        code: i32,

        /// Error message
        #[arg(short, long, required_unless_present = "json")]
        message: Option<String>,

        /// File that raised the fault
        #[arg(short, long, default_value = "unknown")]
        file: String,

        /// Line number
        #[arg(short, long, default_value = "0")]
        line: u32,

        /// Error record as JSON (`-` for stdin)
        #[arg(long, conflicts_with = "message")]
        json: Option<String>,

        /// Requested URI
        #[arg(long, default_value = "/")]
        request_uri: String,

        /// Referring URL
        #[arg(long)]
        referrer: Option<String>,
    },

    /// Send a test notification
    Test {
        /// Action to run (email, chat)
        action: TestAction,
    },

    /// List reportable levels and whether they are enabled
    Levels,

    /// Inspect or initialise the settings record
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the stored record
    Show,
    /// Write the default record if nothing is stored
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    tracing::debug!("startle starting");

    match cli.command {
        Commands::Notify {
            code,
            message,
            file,
            line,
            json,
            request_uri,
            referrer,
        } => {
            let error = match json {
                Some(source) => read_record(&source)?,
                None => ErrorRecord::new(code, message.unwrap_or_default(), file, line),
            };

            let mut request = RequestContext::new(request_uri);
            if let Some(referrer) = referrer {
                request = request.with_referrer(referrer);
            }

            notify(&config, error, request).await?;
        }

        Commands::Test { action } => {
            let handler = Arc::new(ShutdownHandler::from_config(&config).await?);
            let response = Actions::new(handler)
                .dispatch(action, RequestContext::new("/"))
                .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Levels => {
            let settings = settings_store(&config).load().await?.unwrap_or_default();
            for level in REPORTABLE_LEVELS {
                let mark = if settings.is_level_enabled(level.code()) {
                    "x"
                } else {
                    " "
                };
                match level.description() {
                    Some(desc) => println!("[{mark}] {:<16} {desc}", level.as_str()),
                    None => println!("[{mark}] {}", level.as_str()),
                }
            }
        }

        Commands::Settings { command } => {
            let store = settings_store(&config);
            match command {
                SettingsCommand::Show => match store.load().await? {
                    Some(settings) => println!("{}", serde_json::to_string_pretty(&settings)?),
                    None => println!("No settings stored at {}", store.path().display()),
                },
                SettingsCommand::Init => {
                    if store.load().await?.is_some() {
                        println!("Settings already exist at {}", store.path().display());
                    } else {
                        store.save(&NotificationSettings::default()).await?;
                        println!("Wrote default settings to {}", store.path().display());
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn settings_store(config: &Config) -> FileSettingsStore {
    FileSettingsStore::new(config.settings.path.clone())
}

fn read_record(source: &str) -> Result<ErrorRecord> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read error record from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read error record: {source}"))?
    };

    serde_json::from_str(&content).context("Failed to parse error record")
}

async fn notify(config: &Config, error: ErrorRecord, request: RequestContext) -> Result<()> {
    let handler = Arc::new(ShutdownHandler::from_config(config).await?);

    let slot = LastErrorSlot::new();
    install_panic_capture(slot.clone());
    slot.record(error);

    let hook = ShutdownHook::register(handler, slot);
    match hook.fire(request).await {
        Some(Outcome::Suppressed(reason)) => println!("Suppressed: {reason}"),
        Some(Outcome::Dispatched(statuses)) => {
            for status in statuses {
                println!("{status}");
            }
        }
        None => {}
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("startle=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("startle={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
