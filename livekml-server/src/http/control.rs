//! Scene control endpoints.

use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::server::LiveKmlServer;

/// Largest op limit accepted at runtime.
pub const MAX_OP_LIMIT: usize = 200;

/// Body of `POST /control`.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlRequest {
    /// New maximum operations per update.
    pub op_limit: usize,
}

/// Response of `POST /control`.
#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    /// The op limit now in effect.
    pub op_limit: usize,
}

/// `POST /control`: adjust the op limit of a running scene.
pub async fn control_handler(
    Extension(server): Extension<Arc<LiveKmlServer>>,
    Json(request): Json<ControlRequest>,
) -> Result<Json<ControlResponse>> {
    let op_limit = NonZeroUsize::new(request.op_limit)
        .filter(|n| n.get() <= MAX_OP_LIMIT)
        .ok_or(ServerError::InvalidOpLimit {
            value: request.op_limit,
            max: MAX_OP_LIMIT,
        })?;

    server.scene().lock().await.set_op_limit(Some(op_limit));
    Ok(Json(ControlResponse {
        op_limit: op_limit.get(),
    }))
}

/// `POST /clear`: withdraw everything below the root.
pub async fn clear_handler(Extension(server): Extension<Arc<LiveKmlServer>>) -> StatusCode {
    server.scene().lock().await.clear();
    StatusCode::NO_CONTENT
}
