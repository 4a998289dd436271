//! Health check endpoint.

use std::sync::Arc;

use axum::{Extension, Json};
use serde::Serialize;

use crate::server::LiveKmlServer;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Nodes in the scene, root included.
    pub nodes: usize,
    /// Batches waiting for delivery or acknowledgement.
    pub outbox_depth: usize,
    /// Most recent non-empty cycle.
    pub last_cycle: u64,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(Extension(server): Extension<Arc<LiveKmlServer>>) -> Json<HealthStatus> {
    let scene = server.scene().lock().await;

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        nodes: scene.node_count(),
        outbox_depth: scene.outbox_depth(),
        last_cycle: scene.last_cycle().value(),
        uptime_seconds: server.uptime_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_serializes() {
        let status = HealthStatus {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            nodes: 42,
            outbox_depth: 1,
            last_cycle: 7,
            uptime_seconds: 3600,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"nodes\":42"));
        assert!(json.contains("\"last_cycle\":7"));
    }
}
