//! HTTP server for the Agora knowledge engine.
//!
//! Provides endpoints for:
//! - Casting votes (`POST /api/vote`)
//! - Submitting and listing items (`POST /api/items`, `GET /api/items`)
//! - Derived reputation (`GET /api/reputation/:agent`)
//! - Raw topic activity with cursors (`GET /api/activity/:topic`)
//! - Caller-triggered reconciliation (`POST /api/reconcile`)
//! - Health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use server::{router, AppState, RpcServer};
