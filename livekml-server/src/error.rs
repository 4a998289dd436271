//! Error types for livekml-server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use livekml_kml::XmlError;
use livekml_types::SyncError;
use serde::Serialize;

/// Main error type for livekml-server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The scene tree violated a structural precondition.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// A document could not be written.
    #[error("render error: {0}")]
    Xml(#[from] XmlError),

    /// Requested op limit is out of range.
    #[error("op limit {value} out of range (1..={max})")]
    InvalidOpLimit {
        /// The requested value.
        value: usize,
        /// Largest accepted value.
        max: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    details: String,
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::InvalidOpLimit { .. } => (StatusCode::BAD_REQUEST, "invalid_op_limit"),
            ServerError::Sync(SyncError::NodeNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "node_not_found")
            }
            ServerError::Sync(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_scene"),
            ServerError::Xml(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_failed"),
            ServerError::Config(_) | ServerError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error,
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use livekml_types::NodeId;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (
                ServerError::InvalidOpLimit { value: 0, max: 200 },
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::Sync(SyncError::NodeNotFound { id: NodeId::new() }),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::Sync(SyncError::DuplicateId { id: NodeId::new() }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServerError::Sync(SyncError::InvalidName {
                    id: NodeId::new(),
                    name: "a><b".to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServerError::Xml(XmlError::InvalidName("a><b".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn display_includes_range() {
        let err = ServerError::InvalidOpLimit { value: 500, max: 200 };
        assert_eq!(err.to_string(), "op limit 500 out of range (1..=200)");
    }
}
