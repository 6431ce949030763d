//! Reputation-delta payloads on an author's public record.
//!
//! Shape: `{p:"rep-ledger", op:"mint", tick:"approval"|"rejection", amt:"1", reason, timestamp}`.

use agora_types::{ItemId, Outcome, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol marker carried in the `p` field.
pub const REP_LEDGER_PROTOCOL: &str = "rep-ledger";

/// The only operation the engine emits.
pub const MINT_OP: &str = "mint";

/// Which credit a delta grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaTick {
    Approval,
    Rejection,
}

impl From<Outcome> for DeltaTick {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Approved => DeltaTick::Approval,
            Outcome::Rejected => DeltaTick::Rejection,
        }
    }
}

impl fmt::Display for DeltaTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaTick::Approval => f.write_str("approval"),
            DeltaTick::Rejection => f.write_str("rejection"),
        }
    }
}

/// A `+amt` approval or rejection credit to an author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationDelta {
    pub p: String,
    pub op: String,
    pub tick: DeltaTick,
    pub amt: String,
    pub reason: String,
    pub timestamp: String,
}

impl ReputationDelta {
    /// The delta emitted when `item_id` reaches `outcome`.
    pub fn for_outcome(outcome: Outcome, item_id: &ItemId, at: Timestamp) -> Self {
        Self {
            p: REP_LEDGER_PROTOCOL.to_string(),
            op: MINT_OP.to_string(),
            tick: outcome.into(),
            amt: "1".to_string(),
            reason: reason_for(outcome, item_id),
            timestamp: at.to_iso(),
        }
    }

    /// Parsed amount; `None` for non-numeric amounts.
    pub fn amount(&self) -> Option<u64> {
        self.amt.trim().parse().ok()
    }

    /// The key under which re-emitted copies of the same delta collapse.
    pub fn dedup_key(&self) -> (DeltaTick, String) {
        (self.tick, self.reason.clone())
    }

    /// The item this delta credits, when the reason follows the engine's format.
    pub fn item_id(&self) -> Option<ItemId> {
        let (_, id) = self.reason.split_once(':')?;
        if id.is_empty() {
            None
        } else {
            Some(ItemId::new(id))
        }
    }
}

/// `item_approved:<id>` / `item_rejected:<id>`.
pub fn reason_for(outcome: Outcome, item_id: &ItemId) -> String {
    match outcome {
        Outcome::Approved => format!("item_approved:{item_id}"),
        Outcome::Rejected => format!("item_rejected:{item_id}"),
    }
}
