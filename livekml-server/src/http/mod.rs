//! HTTP endpoints for livekml-server.
//!
//! The three KML documents a viewer loads, plus control, health and
//! metrics endpoints.

mod control;
pub mod health;
mod kml;
mod metrics;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use crate::server::LiveKmlServer;

pub use control::{ControlRequest, ControlResponse, MAX_OP_LIMIT};
pub use health::HealthStatus;
pub use kml::UpdateQuery;

/// Build the HTTP router with all endpoints.
pub fn build_router(server: Arc<LiveKmlServer>) -> Router {
    let mut router = Router::new()
        .route("/loader.kml", get(kml::loader_handler))
        .route("/elements.kml", get(kml::elements_handler))
        .route("/update.kml", get(kml::update_handler))
        .route("/control", post(control::control_handler))
        .route("/clear", post(control::clear_handler))
        .route("/health", get(health::health_handler));
    if server.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }
    router.layer(Extension(server))
}
