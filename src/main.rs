use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weibo_archiver::api::WeiboClient;
use weibo_archiver::config::Config;
use weibo_archiver::db::Database;
use weibo_archiver::export::export_static;
use weibo_archiver::scan::{self, ScanKind};

#[derive(Debug, Parser)]
#[command(name = "weibo-archiver", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan the timeline once.
    Scan {
        /// Lookback window in days (overrides WEIBO_DAYS).
        #[arg(long)]
        days: Option<u32>,
    },
    /// Scan at startup and then at every SCHEDULE_TIMES entry until stopped.
    Daemon,
    /// Write the static JSON site.
    Export {
        /// Output directory (overrides EXPORT_DIR).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Re-process every archived post from its stored payload.
    Refresh,
}

impl Command {
    /// Whether the command talks to the upstream API and so needs credentials.
    const fn needs_upstream(&self) -> bool {
        !matches!(self, Self::Export { .. })
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Command::Scan { days: Some(days) } = cli.command {
        config.days_back = Some(days);
    }
    config.validate().context("Invalid configuration")?;
    if cli.command.needs_upstream() {
        config
            .validate_credentials()
            .context("Invalid configuration")?;
        info!(account_id = %config.account_id, "Configuration loaded");
    }

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    match cli.command {
        Command::Scan { .. } => {
            let client = WeiboClient::new(&config)?;
            let report = scan::scan_once(&config, &db, &client, ScanKind::Manual).await?;
            info!(?report, "Scan finished");
        }
        Command::Daemon => {
            let client = WeiboClient::new(&config)?;
            tokio::select! {
                () = scan::run_loop(config, db, client) => {},
                () = shutdown_signal() => info!("Shutting down"),
            }
        }
        Command::Export { out } => {
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            export_static(&db, &dir, config.image_workers).await?;
        }
        Command::Refresh => {
            let client = WeiboClient::new(&config)?;
            let report = scan::refresh_all(
                &db,
                &client,
                Local::now().fixed_offset(),
                config.post_delay / 2,
            )
            .await?;
            info!(?report, "Refresh finished");
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,weibo_archiver=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
