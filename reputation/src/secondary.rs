//! The secondary reputation ledger: an external cache of derived scores and
//! approved content pointers.
//!
//! Every write is idempotent. A score write replaces the whole score, and a
//! content write upserts by item id, so a stale or repeated sync can always be
//! re-run.

use crate::derive::ReputationScore;
use crate::error::SyncError;
use agora_types::{AgentId, Category, ItemId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A pointer to approved content on the author's public content list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    pub item_id: ItemId,
    pub category: Category,
    /// Opaque content-store pointer; falls back to the item id when the
    /// submission carried none.
    pub pointer: String,
    pub approved_at: String,
}

/// What the secondary ledger holds for one agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationRecord {
    #[serde(flatten)]
    pub score: ReputationScore,
    #[serde(default)]
    pub content: Vec<ContentEntry>,
}

#[async_trait]
pub trait ReputationLedger: Send + Sync {
    /// The stored record, or `None` if the agent has never been synced.
    async fn record(&self, agent: &AgentId) -> Result<Option<ReputationRecord>, SyncError>;

    /// Replace the agent's score.
    async fn put_score(&self, agent: &AgentId, score: &ReputationScore) -> Result<(), SyncError>;

    /// Insert or replace a content entry, keyed by item id.
    async fn put_content(&self, agent: &AgentId, entry: &ContentEntry) -> Result<(), SyncError>;
}

/// HTTP client for a secondary ledger service.
///
/// - `GET  {base}/reputation/{agent}` returns a [`ReputationRecord`] or 404
/// - `PUT  {base}/reputation/{agent}` stores a [`ReputationScore`]
/// - `PUT  {base}/reputation/{agent}/content/{itemId}` stores a [`ContentEntry`]
pub struct HttpReputationLedger {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpReputationLedger {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SyncError::ClientSetup(e.to_string()))?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn record_url(&self, agent: &AgentId) -> String {
        format!("{}/reputation/{}", self.base_url, agent)
    }
}

fn map_send_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Unreachable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        SyncError::Unreachable(format!("connection failed: {e}"))
    } else {
        SyncError::RequestFailed(e.to_string())
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), SyncError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SyncError::RequestFailed(format!("HTTP status {status}")))
    }
}

#[async_trait]
impl ReputationLedger for HttpReputationLedger {
    async fn record(&self, agent: &AgentId) -> Result<Option<ReputationRecord>, SyncError> {
        let response = self
            .http_client
            .get(self.record_url(agent))
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(&response)?;

        let record = response.json().await.map_err(|e| {
            SyncError::InvalidResponse(format!("failed to parse reputation record: {e}"))
        })?;
        Ok(Some(record))
    }

    async fn put_score(&self, agent: &AgentId, score: &ReputationScore) -> Result<(), SyncError> {
        let response = self
            .http_client
            .put(self.record_url(agent))
            .json(score)
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(&response)
    }

    async fn put_content(&self, agent: &AgentId, entry: &ContentEntry) -> Result<(), SyncError> {
        let url = format!("{}/content/{}", self.record_url(agent), entry.item_id);
        let response = self
            .http_client
            .put(url)
            .json(entry)
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_wire_shape_is_flat_camel_case() {
        let record = ReputationRecord {
            score: ReputationScore::from_counts(2, 1),
            content: vec![ContentEntry {
                item_id: ItemId::new("kb-1"),
                category: Category::Code,
                pointer: "bafy123".into(),
                approved_at: "2024-01-01T00:00:00.000Z".into(),
            }],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["approvals"], 2);
        assert_eq!(json["netScore"], 1);
        assert_eq!(json["content"][0]["itemId"], "kb-1");
        assert_eq!(json["content"][0]["category"], "code");
    }

    #[test]
    fn record_without_content_parses() {
        let record: ReputationRecord = serde_json::from_str(
            r#"{"approvals":1,"rejections":0,"netScore":1,"contributions":1}"#,
        )
        .unwrap();
        assert!(record.content.is_empty());
        assert_eq!(record.score.contributions, 1);
    }

    #[test]
    fn urls_are_built_from_a_normalised_base() {
        let ledger = HttpReputationLedger::new("http://rep.local/").unwrap();
        assert_eq!(ledger.record_url(&AgentId::new("0.0.7")), "http://rep.local/reputation/0.0.7");
    }
}
