use agora_ledger::LedgerError;
use agora_types::{AgentId, ItemId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The author's public topic could not be read.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("secondary ledger unreachable: {0}")]
    Unreachable(String),

    #[error("secondary ledger request failed: {0}")]
    RequestFailed(String),

    #[error("invalid secondary ledger response: {0}")]
    InvalidResponse(String),

    #[error("secondary ledger client setup failed: {0}")]
    ClientSetup(String),
}

/// A non-fatal problem met after the primary outcome was already durable.
///
/// Warnings travel inside successful results; a later reconciliation pass
/// catches up whatever they describe.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SyncWarning {
    #[error("secondary ledger sync failed for {agent} ({operation}): {reason}")]
    SecondaryLedgerSyncFailed {
        agent: AgentId,
        operation: &'static str,
        reason: String,
    },

    #[error("reputation of {agent} could not be re-derived: {reason}")]
    ReputationReadFailed { agent: AgentId, reason: String },

    #[error("delta {reason} for {agent} not yet visible on the ledger; counted optimistically")]
    DeltaNotVisible { agent: AgentId, reason: String },

    #[error("no public topic registered for author {agent}; reputation delta deferred")]
    AuthorTopicMissing { agent: AgentId },

    #[error("finalized event for {item_id} could not be appended: {reason}")]
    FinalizationAppendFailed { item_id: ItemId, reason: String },

    #[error("reputation delta for {item_id} could not be appended: {reason}")]
    DeltaAppendFailed { item_id: ItemId, reason: String },

    #[error("no personal topic registered for voter {agent}; activity record skipped")]
    VoterTopicMissing { agent: AgentId },

    #[error("activity record for {agent} could not be appended: {reason}")]
    ActivityAppendFailed { agent: AgentId, reason: String },
}

impl SyncWarning {
    /// Stable machine-readable code, used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            SyncWarning::SecondaryLedgerSyncFailed { .. } => "secondary_ledger_sync_failed",
            SyncWarning::ReputationReadFailed { .. } => "reputation_read_failed",
            SyncWarning::DeltaNotVisible { .. } => "delta_not_visible",
            SyncWarning::AuthorTopicMissing { .. } => "author_topic_missing",
            SyncWarning::FinalizationAppendFailed { .. } => "finalization_append_failed",
            SyncWarning::DeltaAppendFailed { .. } => "delta_append_failed",
            SyncWarning::VoterTopicMissing { .. } => "voter_topic_missing",
            SyncWarning::ActivityAppendFailed { .. } => "activity_append_failed",
        }
    }
}
