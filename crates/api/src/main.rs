//! Smart Health Surveillance - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, ServiceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load().context("failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== Smart Health Surveillance v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Model directory: {}", config.model.dir.display());

    run_server(config).await.context("server stopped with an error")?;

    Ok(())
}
