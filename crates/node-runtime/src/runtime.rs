//! Node runtime: owns the stores, the hub and every background task.
//!
//! ## Startup Sequence
//!
//! 1. Create the hub and one window store per served topic
//! 2. Bind the viewer gateway
//! 3. Spawn the event pipe, the GC ticker and the data sources
//! 4. Serve viewers until shutdown
//!
//! Shutdown flips the watch channel, closes every viewer queue and then the
//! event channel, so each task ends on its own.

use crate::container::NodeConfig;
use crate::datasrc::{DataSource, MockSource};
use anyhow::{Context, Result};
use cw_01_window_store::WindowDag;
use cw_03_viewer_gateway::{ServerState, ServerStats, ViewerGateway};
use parking_lot::Mutex;
use shared_bus::Hub;
use shared_types::Topic;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How long shutdown waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct NodeRuntime {
    config: NodeConfig,
    hub: Arc<Hub>,
    server: Arc<ServerState>,
    blocks: Arc<WindowDag>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("invalid node configuration")?;

        let hub = Arc::new(Hub::new());
        let blocks = Arc::new(
            WindowDag::new(config.window.capacity).context("failed to create block store")?,
        );
        let mut server = ServerState::new(Arc::clone(&hub), config.sync.clone());
        server.set_dag(Topic::BLOCKS, Arc::clone(&blocks));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            hub,
            server: Arc::new(server),
            blocks,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Binds the gateway and spawns every task. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let gateway = ViewerGateway::bind(self.config.gateway_config(), Arc::clone(&self.server))
            .await
            .context("failed to start viewer gateway")?;
        let addr = gateway.local_addr();

        let mut tasks = Vec::new();
        tasks.push((
            "event-pipe",
            tokio::spawn(Arc::clone(&self.server).pipe_events()),
        ));
        tasks.push((
            "gc",
            tokio::spawn(run_gc(
                Arc::clone(&self.blocks),
                self.config.window.gc_interval,
                self.shutdown_rx.clone(),
            )),
        ));

        if self.config.source.enabled {
            let source = MockSource::new(
                Arc::clone(&self.blocks),
                Topic::BLOCKS,
                self.config.source.interval,
            );
            match self.server.event_sender() {
                Some(events) => {
                    let shutdown = self.shutdown_rx.clone();
                    info!(source = source.name(), "Starting data source");
                    tasks.push((
                        "data-source",
                        tokio::spawn(async move { source.run(events, shutdown).await }),
                    ));
                }
                None => warn!("Event channel already closed, data source not started"),
            }
        }

        let mut gateway_shutdown = self.shutdown_rx.clone();
        tasks.push((
            "gateway",
            tokio::spawn(async move {
                let signal = async move {
                    let _ = gateway_shutdown.wait_for(|stop| *stop).await;
                };
                if let Err(e) = gateway.run(signal).await {
                    error!(error = %e, "Viewer gateway failed");
                }
            }),
        ));

        self.tasks.lock().extend(tasks);
        info!(
            %addr,
            capacity = self.config.window.capacity,
            window_size = self.config.sync.window_size,
            "Node runtime started"
        );
        Ok(addr)
    }

    /// Signals every task to stop and waits for them.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if self.shutdown_tx.send(true).is_err() {
            debug!("No task was listening for shutdown");
        }
        self.hub.close_all();
        self.server.close_events();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let (names, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        match tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles)).await {
            Ok(results) => {
                for (name, result) in names.iter().zip(results) {
                    if let Err(e) = result {
                        error!(task = name, error = %e, "Task ended abnormally");
                    }
                }
            }
            Err(_) => warn!(tasks = ?names, "Timed out waiting for tasks"),
        }
        info!("Shutdown complete");
    }

    pub fn server(&self) -> &Arc<ServerState> {
        &self.server
    }

    pub fn blocks(&self) -> &Arc<WindowDag> {
        &self.blocks
    }

    pub fn stats(&self) -> ServerStats {
        self.server.stats()
    }
}

/// Runs `dag.gc()` every `interval` until shutdown.
pub async fn run_gc(dag: Arc<WindowDag>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let dag = Arc::clone(&dag);
                match tokio::task::spawn_blocking(move || dag.gc()).await {
                    Ok(report) if report.evicted_layers > 0 => {
                        debug!(evicted = report.evicted_layers, nodes = report.evicted_nodes, "GC pass");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "GC pass panicked"),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("GC ticker stopped");
}
