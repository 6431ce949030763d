//! Payloads appended to per-category item topics and personal records.

use agora_types::{AgentId, Category, ItemId, Outcome, Timestamp, VoteDirection};
use serde::{Deserialize, Serialize};

/// `item_submitted`: creates a knowledge item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSubmitted {
    pub item_id: ItemId,
    pub author: AgentId,
    pub category: Category,
    pub content: String,
    /// Opaque pointer into the content store; never interpreted here.
    #[serde(default)]
    pub content_pointer: Option<String>,
    pub timestamp: String,
}

/// `item_voted`: one voter's approve/reject on one item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVoted {
    pub item_id: ItemId,
    pub voter: AgentId,
    pub vote: VoteDirection,
    pub timestamp: String,
}

impl ItemVoted {
    pub fn new(item_id: ItemId, voter: AgentId, vote: VoteDirection, at: Timestamp) -> Self {
        Self {
            item_id,
            voter,
            vote,
            timestamp: at.to_iso(),
        }
    }
}

/// `item_approved` / `item_rejected`: the single terminal event for an item.
///
/// The outcome lives in the `action` tag, so it is carried alongside the body
/// rather than as a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFinalized {
    pub outcome: Outcome,
    pub body: FinalizedBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedBody {
    pub item_id: ItemId,
    pub author: AgentId,
    /// The voters whose same-direction votes finalized the item.
    #[serde(default)]
    pub voters: Vec<AgentId>,
    pub timestamp: String,
}

impl ItemFinalized {
    pub fn new(
        outcome: Outcome,
        item_id: ItemId,
        author: AgentId,
        voters: Vec<AgentId>,
        at: Timestamp,
    ) -> Self {
        Self {
            outcome,
            body: FinalizedBody {
                item_id,
                author,
                voters,
                timestamp: at.to_iso(),
            },
        }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.body.item_id
    }
}

/// `vote_cast`: the voter's own activity record of a vote it cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
    pub item_id: ItemId,
    pub author: AgentId,
    pub category: Category,
    pub vote: VoteDirection,
    pub timestamp: String,
}
