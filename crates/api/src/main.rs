//! MavunoWatch API - Main Entry Point
//!
//! Usage: `mavuno-api [config.toml]`

use anyhow::Context;
use api::{init_logging, run_server, ApiConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ApiConfig::load(config_path.as_deref()).context("loading configuration")?;
    init_logging(config.level()).context("installing tracing subscriber")?;

    info!("=== MavunoWatch API v{} ===", env!("CARGO_PKG_VERSION"));

    run_server(config)
        .await
        .map_err(|e| anyhow::anyhow!("server failed: {}", e))
}
