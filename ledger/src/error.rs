use agora_types::TopicId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The read or write could not reach the ledger. Retryable by the caller.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("topic {0} not found")]
    TopicNotFound(TopicId),

    #[error("append to topic {topic} rejected: {reason}")]
    AppendRejected { topic: TopicId, reason: String },

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),

    #[error("ledger client setup failed: {0}")]
    ClientSetup(String),
}

impl LedgerError {
    /// Whether repeating the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}
