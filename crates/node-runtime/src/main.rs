//! # Chainwatch
//!
//! Serves a live, windowed view of a parent-linked item stream to websocket
//! viewers.
//!
//! ```text
//! MockSource ──DataEvent──→ event pipe ──add_box──→ WindowDag (blocks)
//!                               │                       ↑
//!                            Trigger              diff + status
//!                               ↓                       │
//!                              Hub ──→ per-viewer RequestHandler ──frames──→ /ws
//! ```
//!
//! Log level comes from `CW_LOG_LEVEL`, then `RUST_LOG`, then `info`.

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn load_config() -> Result<NodeConfig> {
    let config = NodeConfig::from_env().context("failed to load configuration")?;
    info!(
        listen = %config.network.listen_addr,
        home_page = %config.network.home_page.display(),
        capacity = config.window.capacity,
        mock_source = config.source.enabled,
        "Configuration loaded"
    );
    Ok(config)
}

fn env_filter() -> EnvFilter {
    std::env::var("CW_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    let runtime = NodeRuntime::new(config)?;
    let addr = runtime.start().await?;
    info!(%addr, "Chainwatch ready, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    runtime.shutdown().await;
    Ok(())
}
