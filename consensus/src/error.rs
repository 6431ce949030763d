use agora_types::{AgentId, ItemId, Outcome};
use thiserror::Error;

/// Why a proposed vote was refused. Detected before any append.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("agent {voter} cannot vote on their own item")]
    SelfVoteForbidden { voter: AgentId },

    #[error("agent {voter} has already voted on item {item_id}")]
    DuplicateVote { item_id: ItemId, voter: AgentId },

    #[error("item {item_id} is already {outcome}")]
    AlreadyFinalized { item_id: ItemId, outcome: Outcome },
}

impl AdmissionError {
    /// Stable label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::ItemNotFound(_) => "item_not_found",
            AdmissionError::SelfVoteForbidden { .. } => "self_vote",
            AdmissionError::DuplicateVote { .. } => "duplicate_vote",
            AdmissionError::AlreadyFinalized { .. } => "already_finalized",
        }
    }
}
