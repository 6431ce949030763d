use agora_consensus::AdmissionError;
use agora_directory::DirectoryError;
use agora_ledger::LedgerError;
use agora_types::{AgentId, ItemId, Outcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A read of the primary ledger failed. Nothing was appended.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("{voter} cannot vote on their own item")]
    SelfVoteForbidden { voter: AgentId },

    #[error("{voter} has already voted on item {item_id}")]
    DuplicateVote { item_id: ItemId, voter: AgentId },

    #[error("item {item_id} is already {outcome}")]
    AlreadyFinalized { item_id: ItemId, outcome: Outcome },

    /// Appending the vote, submission or finalized event failed.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("credential does not resolve to a known agent")]
    UnknownCredential,

    #[error("identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("no records registered for agent {0}")]
    UnknownAgent(AgentId),

    #[error("item {0} already exists")]
    DuplicateItem(ItemId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// Short label used for the rejected-votes metric.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::LedgerUnavailable(_) => "ledger_unavailable",
            EngineError::ItemNotFound(_) => "item_not_found",
            EngineError::SelfVoteForbidden { .. } => "self_vote",
            EngineError::DuplicateVote { .. } => "duplicate_vote",
            EngineError::AlreadyFinalized { .. } => "already_finalized",
            EngineError::CommitFailed(_) => "commit_failed",
            EngineError::UnknownCredential => "unknown_credential",
            EngineError::IdentityUnavailable(_) => "identity_unavailable",
            EngineError::UnknownAgent(_) => "unknown_agent",
            EngineError::DuplicateItem(_) => "duplicate_item",
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::Config(_) => "config",
        }
    }
}

impl From<AdmissionError> for EngineError {
    fn from(e: AdmissionError) -> Self {
        match e {
            AdmissionError::ItemNotFound(item_id) => EngineError::ItemNotFound(item_id),
            AdmissionError::SelfVoteForbidden { voter } => EngineError::SelfVoteForbidden { voter },
            AdmissionError::DuplicateVote { item_id, voter } => {
                EngineError::DuplicateVote { item_id, voter }
            }
            AdmissionError::AlreadyFinalized { item_id, outcome } => {
                EngineError::AlreadyFinalized { item_id, outcome }
            }
        }
    }
}

/// Read-path conversion. Append failures are mapped to
/// [`EngineError::CommitFailed`] explicitly at the call site.
impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        EngineError::LedgerUnavailable(e.to_string())
    }
}

impl From<DirectoryError> for EngineError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::UnknownCredential => EngineError::UnknownCredential,
            DirectoryError::Ledger(e) => e.into(),
            other => EngineError::IdentityUnavailable(other.to_string()),
        }
    }
}
