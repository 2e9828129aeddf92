//! sherpa-studio - browser demo dashboard for a Sherpa annotation server
//!
//! Connect with server credentials, pick a project and a plan/annotator,
//! submit text, and view the returned entities as colored highlighted text
//! plus category tables.

use anyhow::Result;
use clap::Parser;
use sherpa_common::config::{CliOverrides, StudioConfig};
use sherpa_studio::cache::CachedClient;
use sherpa_studio::services::SherpaClient;
use sherpa_studio::{build_router, AppState};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "sherpa-studio", about = "Demo dashboard for a Sherpa annotation server")]
struct Args {
    /// Listen address, e.g. 127.0.0.1:8701
    #[arg(long)]
    bind: Option<String>,

    /// Sherpa server URL pre-filled in the connect form
    #[arg(long)]
    server: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber before anything else
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Sherpa Studio v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = StudioConfig::resolve(&CliOverrides {
        bind: args.bind,
        server: args.server,
        config_file: args.config,
    });
    info!("Default Sherpa server: {}", config.default_server);

    let client = CachedClient::new(SherpaClient::new(config.timeout_secs)?);

    let bind = config.bind.clone();
    let state = AppState::new(config, client);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("sherpa-studio listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
