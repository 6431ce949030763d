//! Result shapes returned by [`KnowledgeEngine`](crate::KnowledgeEngine)
//! operations. All serialize in camelCase, which is what HTTP clients see.

use agora_consensus::ItemSnapshot;
use agora_ledger::Event;
use agora_messages::{encode, DeltaTick};
use agora_reputation::{ReputationRecord, ReputationScore};
use agora_types::{AgentId, Category, ItemId, ItemStatus, TopicId, VoteDirection};
use serde::{Deserialize, Serialize};

/// Response to a successfully admitted vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub success: bool,
    pub item_id: ItemId,
    pub vote: VoteDirection,
    pub voter: AgentId,
    pub author: AgentId,
    pub approvals: u32,
    pub rejections: u32,
    pub status: ItemStatus,
    /// Set when this vote finalized the item.
    pub reputation_effect: Option<ReputationEffect>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What a finalization did to the author's reputation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationEffect {
    pub author: AgentId,
    pub credit: DeltaTick,
    /// Whether the delta reached the author's public topic.
    pub delta_recorded: bool,
    /// The re-derived score, when the sync succeeded.
    pub score: Option<ReputationScore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub item_id: ItemId,
    pub category: Category,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_pointer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub success: bool,
    pub item_id: ItemId,
    pub author: AgentId,
    pub category: Category,
    pub sequence_number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub item_id: ItemId,
    pub author: AgentId,
    pub category: Category,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_pointer: Option<String>,
    pub approvals: u32,
    pub rejections: u32,
    pub voters: Vec<AgentId>,
    pub status: ItemStatus,
    pub created_at: String,
}

impl From<ItemSnapshot<'_>> for ItemView {
    fn from(snapshot: ItemSnapshot<'_>) -> Self {
        let submission = snapshot.submission;
        Self {
            item_id: submission.item_id.clone(),
            author: submission.author.clone(),
            category: submission.category,
            content: submission.content.clone(),
            content_pointer: submission.content_pointer.clone(),
            approvals: snapshot.tally.approvals,
            rejections: snapshot.tally.rejections,
            voters: snapshot.voters,
            status: snapshot.status,
            created_at: submission.created_at.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ItemCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

/// Every item, grouped by status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ItemListing {
    pub pending: Vec<ItemView>,
    pub approved: Vec<ItemView>,
    pub rejected: Vec<ItemView>,
    pub counts: ItemCounts,
}

impl ItemListing {
    pub fn push(&mut self, item: ItemView) {
        self.counts.total += 1;
        match item.status {
            ItemStatus::Pending => {
                self.counts.pending += 1;
                self.pending.push(item);
            }
            ItemStatus::Approved => {
                self.counts.approved += 1;
                self.approved.push(item);
            }
            ItemStatus::Rejected => {
                self.counts.rejected += 1;
                self.rejected.push(item);
            }
        }
    }

    pub fn find(&self, item_id: &ItemId) -> Option<&ItemView> {
        self.pending
            .iter()
            .chain(&self.approved)
            .chain(&self.rejected)
            .find(|item| &item.item_id == item_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationView {
    pub agent: AgentId,
    pub public_topic: TopicId,
    /// Derived from the primary ledger; authoritative.
    pub score: ReputationScore,
    /// The secondary ledger's cached copy, if available.
    pub secondary: Option<ReputationRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One decoded event for the activity feed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub sequence_number: u64,
    pub consensus_timestamp: String,
    pub kind: &'static str,
    /// The decoded payload re-encoded to its wire form. Fields the decoder does
    /// not know are not carried over.
    pub payload: serde_json::Value,
}

impl From<&Event> for ActivityEntry {
    fn from(event: &Event) -> Self {
        Self {
            sequence_number: event.sequence_number,
            consensus_timestamp: event.consensus_timestamp.to_string(),
            kind: event.payload.kind(),
            payload: serde_json::from_slice(&encode(&event.payload)).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    pub topic_id: TopicId,
    pub entries: Vec<ActivityEntry>,
    /// Sequence number to continue after; `None` once a read past `after`
    /// comes back empty. A short page still carries a cursor.
    pub next_after: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub items_checked: usize,
    pub finalized_emitted: usize,
    pub deltas_emitted: usize,
    pub authors_synced: usize,
    pub warnings: Vec<String>,
}
