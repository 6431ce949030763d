//! HTTP client for an external identity-resolution service.

use crate::error::DirectoryError;
use crate::identity::IdentityResolver;
use agora_types::AgentId;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Default timeout for identity requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves credentials by calling `GET {base_url}/identity/{credential}`.
///
/// The service answers `{"agentId": "..."}` for a known credential and 404
/// for an unknown one.
pub struct HttpIdentityResolver {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    agent_id: String,
}

impl HttpIdentityResolver {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DirectoryError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::ClientSetup(e.to_string()))?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<AgentId, DirectoryError> {
        let url = format!("{}/identity/{}", self.base_url, credential.trim());

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                DirectoryError::Unreachable(format!("request timed out: {e}"))
            } else if e.is_connect() {
                DirectoryError::Unreachable(format!("connection failed: {e}"))
            } else {
                DirectoryError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DirectoryError::UnknownCredential);
        }
        if !status.is_success() {
            return Err(DirectoryError::RequestFailed(format!("HTTP status {status}")));
        }

        let body: IdentityResponse = response.json().await.map_err(|e| {
            DirectoryError::InvalidResponse(format!("failed to parse identity response: {e}"))
        })?;

        AgentId::parse(body.agent_id)
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_response_deserialization() {
        let resp: IdentityResponse = serde_json::from_str(r#"{"agentId":"0.0.4411"}"#).unwrap();
        assert_eq!(resp.agent_id, "0.0.4411");
    }

    #[test]
    fn base_url_is_normalised() {
        let resolver = HttpIdentityResolver::new("http://identity.local/").unwrap();
        assert_eq!(resolver.base_url, "http://identity.local");
    }
}
