//! HTTP surface tests driven through the router with `oneshot`.

use agora_directory::{AgentTopics, StaticIdentityResolver};
use agora_node::{EngineConfig, EngineDeps, EngineMetrics, KnowledgeEngine};
use agora_nullables::{InMemoryLedger, NullClock, NullReputationLedger};
use agora_rpc::pagination::encode_cursor;
use agora_rpc::{router, AppState};
use agora_types::{AgentId, Category, TopicId};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    app: Router,
    ledger: Arc<InMemoryLedger>,
    research: TopicId,
}

fn test_app(enable_metrics: bool) -> TestApp {
    let ledger = Arc::new(InMemoryLedger::new());
    let research = ledger.create_topic();

    let mut identity = StaticIdentityResolver::default();
    let mut overrides = HashMap::new();
    for name in ["alice", "bob", "carol"] {
        identity = identity.with(format!("tok-{name}"), name);
        overrides.insert(
            AgentId::new(name),
            AgentTopics {
                personal: ledger.create_topic(),
                public: ledger.create_topic(),
            },
        );
    }

    let config = EngineConfig {
        category_topics: BTreeMap::from([(Category::Research, research.clone())]),
        directory_overrides: overrides,
        ..EngineConfig::default()
    };
    let engine = KnowledgeEngine::new(
        config,
        EngineDeps {
            ledger: ledger.clone(),
            identity: Arc::new(identity),
            secondary: Some(Arc::new(NullReputationLedger::new())),
            clock: Arc::new(NullClock::default()),
            metrics: Arc::new(EngineMetrics::new()),
        },
    );
    let app = router(AppState {
        engine: Arc::new(engine),
        enable_metrics,
    });
    TestApp {
        app,
        ledger,
        research,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "JSON parse error: {e} (status={status}, body={:?})",
            String::from_utf8_lossy(&body)
        )
    });
    (status, json)
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(path).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn submit_x(app: &Router) {
    let (status, json) = post_json(
        app,
        "/api/items",
        json!({
            "credential": "tok-alice",
            "itemId": "X",
            "category": "research",
            "content": "a survey of ledgers",
            "contentPointer": "bafy-x"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
}

async fn vote(app: &Router, credential: &str, direction: &str) -> (StatusCode, Value) {
    post_json(
        app,
        "/api/vote",
        json!({ "itemId": "X", "credential": credential, "vote": direction }),
    )
    .await
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vote_response_carries_tallies_and_reputation_effect() {
    let t = test_app(false);
    submit_x(&t.app).await;

    let (status, json) = vote(&t.app, "tok-bob", "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending");
    assert!(json.get("reputationEffect").map_or(true, Value::is_null));

    let (status, json) = vote(&t.app, "tok-carol", "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["itemId"], "X");
    assert_eq!(json["author"], "alice");
    assert_eq!(json["approvals"], 2);
    assert_eq!(json["status"], "approved");
    assert_eq!(json["reputationEffect"]["deltaRecorded"], true);
}

#[tokio::test]
async fn admission_failures_render_as_error_bodies() {
    let t = test_app(false);
    submit_x(&t.app).await;

    let (status, json) = vote(&t.app, "tok-alice", "approve").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("alice"));

    vote(&t.app, "tok-bob", "reject").await;
    let (status, _) = vote(&t.app, "tok-bob", "approve").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = vote(&t.app, "tok-mallory", "approve").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(
        &t.app,
        "/api/vote",
        json!({ "itemId": "nope", "credential": "tok-bob", "vote": "approve" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_vote_body_is_bad_request() {
    let t = test_app(false);
    let (status, json) = post_json(
        &t.app,
        "/api/vote",
        json!({ "itemId": "X", "credential": "tok-bob", "vote": "maybe" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn ledger_outage_is_service_unavailable() {
    let t = test_app(false);
    t.ledger.set_reads_unavailable(true);
    let (status, json) = get_json(&t.app, "/api/items").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["success"], false);
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_items_groups_by_status() {
    let t = test_app(false);
    submit_x(&t.app).await;
    vote(&t.app, "tok-bob", "reject").await;

    let (status, json) = get_json(&t.app, "/api/items").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["counts"]["pending"], 1);
    assert_eq!(json["counts"]["total"], 1);
    let item = &json["pending"][0];
    assert_eq!(item["itemId"], "X");
    assert_eq!(item["category"], "research");
    assert_eq!(item["rejections"], 1);
    assert_eq!(item["voters"], json!(["bob"]));
}

#[tokio::test]
async fn duplicate_submission_conflicts() {
    let t = test_app(false);
    submit_x(&t.app).await;
    let (status, _) = post_json(
        &t.app,
        "/api/items",
        json!({ "credential": "tok-bob", "itemId": "X", "category": "research", "content": "again" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reputation_endpoint_reports_derived_score() {
    let t = test_app(false);
    submit_x(&t.app).await;
    vote(&t.app, "tok-bob", "approve").await;
    vote(&t.app, "tok-carol", "approve").await;

    let (status, json) = get_json(&t.app, "/api/reputation/alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["score"]["approvals"], 1);
    assert_eq!(json["score"]["netScore"], 1);
    assert_eq!(json["secondary"]["content"][0]["pointer"], "bafy-x");

    let (status, _) = get_json(&t.app, "/api/reputation/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn activity_pages_with_cursors() {
    let t = test_app(false);
    submit_x(&t.app).await;
    vote(&t.app, "tok-bob", "approve").await;

    let path = format!("/api/activity/{}?count=1", t.research);
    let (status, json) = get_json(&t.app, &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["entries"][0]["kind"], "item_submitted");
    assert_eq!(json["cursor"], encode_cursor(1));

    let path = format!("/api/activity/{}?count=1&cursor={}", t.research, encode_cursor(1));
    let (_, json) = get_json(&t.app, &path).await;
    assert_eq!(json["entries"][0]["kind"], "item_voted");
    assert_eq!(json["entries"][0]["payload"]["voter"], "bob");

    let path = format!("/api/activity/{}?cursor=%21%21", t.research);
    let (status, _) = get_json(&t.app, &path).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reconcile_endpoint_returns_report() {
    let t = test_app(false);
    submit_x(&t.app).await;
    let (status, json) = post_json(&t.app, "/api/reconcile", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["itemsChecked"], 1);
    assert_eq!(json["finalizedEmitted"], 0);
}

// ---------------------------------------------------------------------------
// Health and metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok() {
    let t = test_app(false);
    let (status, json) = get_json(&t.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn metrics_follow_the_enable_flag() {
    let t = test_app(false);
    let (status, _) = get_json(&t.app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let t = test_app(true);
    submit_x(&t.app).await;
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("agora_submissions_total 1"));
}
