//! Prometheus metrics endpoint.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Extension;

use crate::server::LiveKmlServer;

/// Prometheus metrics handler.
///
/// Gauges describe the scene as it is now; counters are monotonic since
/// startup.
pub async fn metrics_handler(Extension(server): Extension<Arc<LiveKmlServer>>) -> impl IntoResponse {
    let m = server.metrics();

    let (nodes, outbox, stats) = {
        let scene = server.scene().lock().await;
        (scene.node_count(), scene.outbox_depth(), scene.stats())
    };

    let polls = m.polls_total.load(Ordering::Relaxed);
    let updates = m.updates_sent.load(Ordering::Relaxed);
    let redeliveries = m.redeliveries_total.load(Ordering::Relaxed);
    let elements = m.elements_served.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP livekml_scene_nodes Nodes in the scene, root included
# TYPE livekml_scene_nodes gauge
livekml_scene_nodes {nodes}

# HELP livekml_outbox_batches Batches awaiting delivery or acknowledgement
# TYPE livekml_outbox_batches gauge
livekml_outbox_batches {outbox}

# HELP livekml_info Server information
# TYPE livekml_info gauge
livekml_info{{version="{version}"}} 1

# HELP livekml_polls_total Update polls answered
# TYPE livekml_polls_total counter
livekml_polls_total {polls}

# HELP livekml_updates_sent_total Updates carrying at least one operation
# TYPE livekml_updates_sent_total counter
livekml_updates_sent_total {updates}

# HELP livekml_redeliveries_total Updates resent after a missing acknowledgement
# TYPE livekml_redeliveries_total counter
livekml_redeliveries_total {redeliveries}

# HELP livekml_elements_served_total Full scene documents served
# TYPE livekml_elements_served_total counter
livekml_elements_served_total {elements}

# HELP livekml_errors_total Requests that failed
# TYPE livekml_errors_total counter
livekml_errors_total {errors}

# HELP livekml_cycles_total Cycles that produced operations
# TYPE livekml_cycles_total counter
livekml_cycles_total {cycles}

# HELP livekml_operations_total Operations emitted, by kind
# TYPE livekml_operations_total counter
livekml_operations_total{{kind="create"}} {creates}
livekml_operations_total{{kind="change"}} {changes}
livekml_operations_total{{kind="delete"}} {deletes}
"#,
        version = env!("CARGO_PKG_VERSION"),
        cycles = stats.cycles,
        creates = stats.creates,
        changes = stats.changes,
        deletes = stats.deletes,
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
