//! Axum-based HTTP server.

use crate::error::RpcError;
use crate::handlers;
use agora_node::KnowledgeEngine;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<KnowledgeEngine>,
    pub enable_metrics: bool,
}

/// Build the router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/vote", post(handlers::cast_vote))
        .route("/api/items", get(handlers::list_items).post(handlers::submit_item))
        .route("/api/reputation/:agent", get(handlers::reputation))
        .route("/api/activity/:topic", get(handlers::activity))
        .route("/api/reconcile", post(handlers::reconcile))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct RpcServer {
    pub bind_address: String,
    pub port: u16,
    pub enable_metrics: bool,
}

impl RpcServer {
    pub fn new(bind_address: impl Into<String>, port: u16) -> Self {
        Self {
            bind_address: bind_address.into(),
            port,
            enable_metrics: false,
        }
    }

    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn start(
        &self,
        engine: Arc<KnowledgeEngine>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RpcError> {
        let addr: SocketAddr = format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| RpcError::Server(format!("invalid bind address: {e}")))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;

        let app = router(AppState {
            engine,
            enable_metrics: self.enable_metrics,
        });
        info!(%addr, metrics = self.enable_metrics, "rpc server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
