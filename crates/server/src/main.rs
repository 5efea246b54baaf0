mod bootstrap;
mod health;
mod http;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use roomie_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// RoomieMatch MCP tool server.
#[derive(Debug, Parser)]
#[command(name = "roomie-server", version, about)]
struct Cli {
    /// Path to roomie.toml; defaults to ./roomie.toml or ./config/roomie.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail when the config file is missing instead of falling back to defaults.
    #[arg(long)]
    require_config: bool,

    /// `memory://` or a sqlite URL.
    #[arg(long)]
    database_url: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    log_level: Option<String>,

    /// Load the demo listings at startup.
    #[arg(long)]
    seed_demo_data: bool,
}

impl Cli {
    fn load_options(self) -> LoadOptions {
        LoadOptions {
            config_path: self.config,
            require_file: self.require_config,
            overrides: ConfigOverrides {
                database_url: self.database_url,
                log_level: self.log_level,
                server_port: self.port,
                seed_demo_data: self.seed_demo_data.then_some(true),
                ..ConfigOverrides::default()
            },
        }
    }
}

fn init_logging(config: &AppConfig) {
    use roomie_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(cli.load_options())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let router = http::router(app.dispatcher, app.store);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.listening",
        correlation_id = "bootstrap",
        bind_address = %address,
        "roomie-server listening; MCP at /mcp, health at /health"
    );

    let shutdown = Arc::new(Notify::new());
    let stop = Arc::clone(&shutdown);
    let serving = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { stop.notified().await })
            .await
    });

    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "roomie-server stopping"
    );
    shutdown.notify_one();

    // Streaming MCP sessions can hold connections open, so draining is bounded.
    match tokio::time::timeout(grace, serving).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "open connections did not drain in time"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
