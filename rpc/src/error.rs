//! RPC error types and their HTTP rendering.

use agora_node::EngineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Engine(e) => match e {
                EngineError::ItemNotFound(_) | EngineError::UnknownAgent(_) => StatusCode::NOT_FOUND,
                EngineError::SelfVoteForbidden { .. } => StatusCode::FORBIDDEN,
                EngineError::DuplicateVote { .. }
                | EngineError::AlreadyFinalized { .. }
                | EngineError::DuplicateItem(_) => StatusCode::CONFLICT,
                EngineError::UnknownCredential => StatusCode::UNAUTHORIZED,
                EngineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                EngineError::LedgerUnavailable(_) | EngineError::IdentityUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                EngineError::CommitFailed(_) => StatusCode::BAD_GATEWAY,
                EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::MetricsDisabled => StatusCode::NOT_FOUND,
            RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "request failed");
        }
        let body = json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
