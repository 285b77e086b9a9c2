mod error;
mod routes;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use expense_ledger::config::{AppConfig, DEFAULT_CONFIG};
use routes::AppState;

#[derive(Parser, Debug)]
#[clap(version, about = "Serve the expense ledger over HTTP")]
struct Args {
    /// Path to the TOML configuration file
    #[clap(short, long, value_parser, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", err);
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = AppConfig::read(&args.config)?;
    let state = AppState::from_config(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!("serving {} on {}", config.storage.data_dir.display(), config.server.bind);

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
