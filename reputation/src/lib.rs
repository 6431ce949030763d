//! Reputation for knowledge authors.
//!
//! An author's reputation is never stored as a counter. It is re-derived on
//! every sync by counting the reputation-delta events on the author's public
//! topic, collapsing re-emitted copies of the same delta and counting at most
//! one delta per item, the one matching its folded outcome. The derived score is
//! then mirrored to the secondary ledger, which is a cache and never
//! authoritative.

pub mod derive;
pub mod error;
pub mod secondary;
pub mod syncer;

pub use derive::{DeltaSet, ItemOutcomes, ReputationScore};
pub use error::{SyncError, SyncWarning};
pub use secondary::{ContentEntry, HttpReputationLedger, ReputationLedger, ReputationRecord};
pub use syncer::{ReadAfterWrite, ReputationSyncer, SyncReport, SyncRequest};
