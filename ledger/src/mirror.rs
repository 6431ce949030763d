//! HTTP client for a ledger mirror node (reads) and submit gateway (appends).
//!
//! Reads: `GET {mirror_url}/api/v1/topics/{topic}/messages?limit=N&order=asc&sequencenumber=gt:S`
//! returns `{"messages":[{"consensus_timestamp","topic_id","message","sequence_number"}]}`
//! with base64-encoded message bodies.
//!
//! Appends: `POST {gateway_url}/topics/{topic}/messages` with `{"message": <base64>}`
//! returns `{"sequenceNumber": n}`.

use crate::client::TopicLedger;
use crate::error::LedgerError;
use crate::event::RawMessage;
use agora_types::TopicId;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for mirror and gateway requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct MirrorConfig {
    pub mirror_url: String,
    pub gateway_url: String,
    pub timeout: Duration,
}

impl MirrorConfig {
    pub fn new(mirror_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            mirror_url: mirror_url.into(),
            gateway_url: gateway_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`TopicLedger`] backed by a mirror node and a submit gateway.
pub struct MirrorClient {
    http_client: reqwest::Client,
    mirror_url: String,
    gateway_url: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<MirrorMessage>,
}

#[derive(Debug, Deserialize)]
struct MirrorMessage {
    consensus_timestamp: String,
    #[serde(default)]
    topic_id: Option<String>,
    message: String,
    sequence_number: u64,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    sequence_number: u64,
}

impl MirrorClient {
    pub fn new(config: &MirrorConfig) -> Result<Self, LedgerError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::ClientSetup(e.to_string()))?;
        Ok(Self {
            http_client,
            mirror_url: config.mirror_url.trim_end_matches('/').to_string(),
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self, topic: &TopicId, after: Option<u64>, limit: usize) -> String {
        let mut url = format!(
            "{}/api/v1/topics/{}/messages?limit={}&order=asc",
            self.mirror_url, topic, limit
        );
        if let Some(after) = after {
            url.push_str(&format!("&sequencenumber=gt:{after}"));
        }
        url
    }
}

fn transport_error(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Unavailable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        LedgerError::Unavailable(format!("connection failed: {e}"))
    } else {
        LedgerError::Unavailable(e.to_string())
    }
}

// Bad bodies still occupy a sequence number; the empty contents fail decoding
// later and the entry is skipped without stalling pagination.
fn into_raw(topic: &TopicId, m: MirrorMessage) -> RawMessage {
    RawMessage {
        topic_id: m.topic_id.map(TopicId::new).unwrap_or_else(|| topic.clone()),
        sequence_number: m.sequence_number,
        consensus_timestamp: m.consensus_timestamp.parse().unwrap_or_default(),
        contents: BASE64.decode(m.message.as_bytes()).unwrap_or_default(),
    }
}

#[async_trait]
impl TopicLedger for MirrorClient {
    async fn fetch_page(
        &self,
        topic: &TopicId,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RawMessage>, LedgerError> {
        let url = self.messages_url(topic, after, limit);
        debug!(%url, "fetching topic page");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LedgerError::TopicNotFound(topic.clone()));
        }
        if !status.is_success() {
            return Err(LedgerError::Unavailable(format!("mirror HTTP status {status}")));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("messages response: {e}")))?;

        Ok(body
            .messages
            .into_iter()
            .map(|m| into_raw(topic, m))
            .collect())
    }

    async fn append(&self, topic: &TopicId, contents: Vec<u8>) -> Result<u64, LedgerError> {
        let url = format!("{}/topics/{}/messages", self.gateway_url, topic);
        let encoded = BASE64.encode(&contents);

        let response = self
            .http_client
            .post(&url)
            .json(&SubmitRequest { message: &encoded })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_client_error() {
            let reason = response.text().await.unwrap_or_default();
            return Err(LedgerError::AppendRejected {
                topic: topic.clone(),
                reason: format!("HTTP {status}: {reason}"),
            });
        }
        if !status.is_success() {
            return Err(LedgerError::Unavailable(format!("gateway HTTP status {status}")));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("submit response: {e}")))?;
        info!(topic = %topic, sequence = body.sequence_number, "message appended");
        Ok(body.sequence_number)
    }
}
