//! Request handlers and their request/response bodies.

use crate::error::RpcError;
use crate::pagination::{encode_cursor, PaginationParams};
use crate::server::AppState;
use agora_node::{
    ActivityPage, ItemListing, ReconcileReport, ReputationView, SubmitReceipt, SubmitRequest,
    VoteOutcome,
};
use agora_types::{AgentId, ItemId, TopicId, VoteDirection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub item_id: ItemId,
    /// Opaque token resolved to the voter by the identity service.
    pub credential: String,
    pub vote: VoteDirection,
}

pub async fn cast_vote(
    State(state): State<AppState>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteOutcome>, RpcError> {
    let Json(request) = body.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    let outcome = state
        .engine
        .cast_vote(&request.credential, &request.item_id, request.vote)
        .await?;
    Ok(Json(outcome))
}

// ── Items ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitItemRequest {
    pub credential: String,
    #[serde(flatten)]
    pub item: SubmitRequest,
}

pub async fn list_items(State(state): State<AppState>) -> Result<Json<ItemListing>, RpcError> {
    Ok(Json(state.engine.list_items().await?))
}

pub async fn submit_item(
    State(state): State<AppState>,
    body: Result<Json<SubmitItemRequest>, JsonRejection>,
) -> Result<Json<SubmitReceipt>, RpcError> {
    let Json(request) = body.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    let receipt = state
        .engine
        .submit_item(&request.credential, request.item)
        .await?;
    Ok(Json(receipt))
}

// ── Reputation ───────────────────────────────────────────────────────────

pub async fn reputation(
    State(state): State<AppState>,
    Path(agent): Path<String>,
) -> Result<Json<ReputationView>, RpcError> {
    let agent = AgentId::parse(agent).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    Ok(Json(state.engine.reputation(&agent).await?))
}

// ── Activity ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    #[serde(flatten)]
    pub page: ActivityPage,
    /// Cursor for the next page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

pub async fn activity(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ActivityResponse>, RpcError> {
    let topic = TopicId::parse(topic).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let page = state
        .engine
        .activity(&topic, params.after()?, params.effective_count())
        .await?;
    let cursor = page.next_after.map(encode_cursor);
    Ok(Json(ActivityResponse { page, cursor }))
}

// ── Operations ───────────────────────────────────────────────────────────

pub async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileReport>, RpcError> {
    Ok(Json(state.engine.reconcile().await?))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, RpcError> {
    if !state.enable_metrics {
        return Err(RpcError::MetricsDisabled);
    }
    let text = state.engine.metrics().encode();
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], text))
}
