//! Domain Watch daemon entry point
//!
//! Loads the TOML configuration, opens the `SQLite` store, and runs the
//! sweep/watch scheduler until Ctrl-C.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use domain_watch_app::adapters::SqliteStore;
use domain_watch_app::config::WEBHOOK_URL_ENV;
use domain_watch_app::{AppConfig, AppState, AppStateBuilder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, ConfigSource};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config_source()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if cli.sweep_now {
        config.monitor.sweep_on_startup = true;
    }

    init_tracing(&config.logging.level);

    let result = if cli.test_webhook {
        test_webhook_delivery(config).await
    } else {
        run(config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(source: &ConfigSource) -> Result<AppConfig> {
    match source {
        ConfigSource::Default(path) if !path.exists() => {
            let mut config = AppConfig::default();
            config.override_webhook_url(std::env::var(WEBHOOK_URL_ENV).ok());
            config.validate()?;
            Ok(config)
        }
        _ => AppConfig::load(source.path())
            .with_context(|| format!("reading {}", source.path().display())),
    }
}

/// Log to stderr; `RUST_LOG` overrides the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn build_state(config: AppConfig) -> Result<AppState> {
    let store = SqliteStore::new(&config.storage.database_path)
        .await
        .context("opening database")?;
    let state = AppStateBuilder::new(config)
        .store(Arc::new(store))
        .build()
        .context("building application state")?;
    Ok(state)
}

async fn test_webhook_delivery(config: AppConfig) -> Result<()> {
    let state = build_state(config).await?;
    let response = state.monitor.send_test_notification().await?;
    if response.success {
        tracing::info!("Test notification delivered (HTTP {})", response.status);
        Ok(())
    } else {
        anyhow::bail!(
            "Test notification rejected: HTTP {} {}",
            response.status,
            response.body.unwrap_or_default()
        )
    }
}

async fn run(config: AppConfig) -> Result<()> {
    tracing::info!("Starting Domain Watch");
    let state = build_state(config).await?;

    let stats = state.monitor.stats().await?;
    tracing::info!(
        "{} domains registered, {} monitored",
        stats.counts.total,
        stats.counts.active
    );

    let handle = state.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("Ctrl-C received, shutting down");

    handle.shutdown().await;
    Ok(())
}
