//! Agora knowledge engine: turns an append-only event log into item
//! outcomes and author reputation.
//!
//! The engine is the coordinator that:
//! - Replays category topics and admits or refuses votes
//! - Commits votes, finalizations and reputation deltas
//! - Mirrors derived reputation to the secondary ledger
//! - Reconciles outcomes whose follow-up appends were lost

pub mod committer;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod views;

pub use committer::{CommitReceipt, FinalizationCommitter, FinalizedRecord, VoteCommit};
pub use config::{EngineConfig, LedgerBackend, NodeConfig, ReadAfterWriteMode};
pub use engine::{EngineDeps, KnowledgeEngine, MAX_ACTIVITY_PAGE};
pub use error::EngineError;
pub use metrics::EngineMetrics;
pub use views::{
    ActivityEntry, ActivityPage, ItemCounts, ItemListing, ItemView, ReconcileReport,
    ReputationEffect, ReputationView, SubmitReceipt, SubmitRequest, VoteOutcome,
};
