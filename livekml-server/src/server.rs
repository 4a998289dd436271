//! Main LiveKmlServer coordination.
//!
//! LiveKmlServer owns the configuration, the scene handle and the
//! operational counters, and runs the HTTP listener.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::http::build_router;
use crate::scene::{Scene, SceneHandle};

/// Operational metrics for monitoring viewer activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Update polls answered.
    pub polls_total: AtomicU64,
    /// Updates that carried at least one operation.
    pub updates_sent: AtomicU64,
    /// Updates that resent an unacknowledged batch.
    pub redeliveries_total: AtomicU64,
    /// Elements documents served.
    pub elements_served: AtomicU64,
    /// Requests that failed.
    pub errors_total: AtomicU64,
}

/// The LiveKML HTTP server.
#[derive(Debug)]
pub struct LiveKmlServer {
    config: Config,
    scene: SceneHandle,
    metrics: ServerMetrics,
    started: Instant,
}

impl LiveKmlServer {
    /// Create a server with an empty scene built from `config`.
    pub fn new(config: Config) -> Self {
        let scene = SceneHandle::new(Scene::new(&config));
        Self {
            config,
            scene,
            metrics: ServerMetrics::default(),
            started: Instant::now(),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The scene served to viewers. Clone it to mutate the scene from
    /// application tasks.
    pub fn scene(&self) -> &SceneHandle {
        &self.scene
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    /// Seconds since the server was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Bind the configured address and serve until the task is cancelled.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.config.server.bind_address).await?;
        tracing::info!(
            address = %listener.local_addr()?,
            loader = %self.config.server.loader_href(),
            "livekml-server listening"
        );
        axum::serve(listener, build_router(self)).await?;
        Ok(())
    }
}
