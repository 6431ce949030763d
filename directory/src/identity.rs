//! Identity resolution: credential → stable agent identifier.

use crate::error::DirectoryError;
use agora_types::AgentId;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Map a caller-supplied credential to the agent it identifies.
    async fn resolve(&self, credential: &str) -> Result<AgentId, DirectoryError>;
}

/// Resolver over a fixed credential table, loaded from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentityResolver {
    tokens: HashMap<String, AgentId>,
}

impl StaticIdentityResolver {
    pub fn new(tokens: HashMap<String, AgentId>) -> Self {
        Self { tokens }
    }

    /// Add a credential, returning `self` for chaining in tests and setup code.
    pub fn with(mut self, credential: impl Into<String>, agent: impl Into<AgentId>) -> Self {
        self.tokens.insert(credential.into(), agent.into());
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<AgentId, DirectoryError> {
        self.tokens
            .get(credential.trim())
            .cloned()
            .ok_or(DirectoryError::UnknownCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_resolver_maps_known_tokens() {
        let resolver = StaticIdentityResolver::default().with("tok-alice", "alice");
        assert_eq!(resolver.resolve("tok-alice").await.unwrap(), AgentId::new("alice"));
        assert!(matches!(
            resolver.resolve("tok-mallory").await,
            Err(DirectoryError::UnknownCredential)
        ));
    }
}
