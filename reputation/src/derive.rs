//! Reputation derivation over reputation-delta events.

use agora_ledger::Event;
use agora_messages::{DeltaTick, LedgerPayload, ReputationDelta};
use agora_types::{ItemId, ItemStatus, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// An author's derived reputation.
///
/// `contributions` counts approved items; every approval credit is one
/// accepted contribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationScore {
    pub approvals: u64,
    pub rejections: u64,
    pub net_score: u64,
    pub contributions: u64,
}

impl ReputationScore {
    pub fn from_counts(approvals: u64, rejections: u64) -> Self {
        Self {
            approvals,
            rejections,
            net_score: approvals.saturating_sub(rejections),
            contributions: approvals,
        }
    }
}

/// Folded item statuses that deltas are counted against.
///
/// Two votes that read the same stale fold can finalize one item in opposite
/// directions, leaving both an approval and a rejection delta on the author's
/// topic. Only the delta matching the folded outcome is counted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemOutcomes {
    statuses: HashMap<ItemId, ItemStatus>,
}

impl ItemOutcomes {
    pub fn record(&mut self, item_id: ItemId, status: ItemStatus) {
        self.statuses.insert(item_id, status);
    }

    /// Record `outcome` unless the item is already known to be terminal.
    pub fn settle(&mut self, item_id: &ItemId, outcome: Outcome) {
        let status = self.statuses.entry(item_id.clone()).or_default();
        if !status.is_terminal() {
            *status = outcome.into();
        }
    }

    pub fn status(&self, item_id: &ItemId) -> Option<ItemStatus> {
        self.statuses.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl FromIterator<(ItemId, ItemStatus)> for ItemOutcomes {
    fn from_iter<I: IntoIterator<Item = (ItemId, ItemStatus)>>(iter: I) -> Self {
        Self {
            statuses: iter.into_iter().collect(),
        }
    }
}

/// The item named by a delta reason such as `item_approved:<id>`.
fn reason_item(reason: &str) -> Option<&str> {
    reason.split_once(':').map(|(_, id)| id).filter(|id| !id.is_empty())
}

/// The distinct deltas found on a public topic, keyed by `(tick, reason)`.
///
/// Inserting a delta whose key is already present is a no-op, so replayed or
/// re-emitted deltas never count twice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeltaSet {
    amounts: BTreeMap<(DeltaTick, String), u64>,
}

impl DeltaSet {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut set = Self::default();
        for event in events {
            if let LedgerPayload::ReputationDelta(delta) = &event.payload {
                set.insert(delta);
            }
        }
        set
    }

    /// Add `delta`; returns `false` when an equivalent delta was already present.
    pub fn insert(&mut self, delta: &ReputationDelta) -> bool {
        let Some(amount) = delta.amount() else {
            return false;
        };
        let key = delta.dedup_key();
        if self.amounts.contains_key(&key) {
            return false;
        }
        self.amounts.insert(key, amount);
        true
    }

    pub fn contains(&self, delta: &ReputationDelta) -> bool {
        self.amounts.contains_key(&delta.dedup_key())
    }

    /// Whether a delta crediting `item_id` with `tick` is present.
    pub fn credits(&self, tick: DeltaTick, item_id: &ItemId) -> bool {
        self.amounts
            .keys()
            .any(|(t, reason)| *t == tick && reason_item(reason) == Some(item_id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Sum every distinct delta, whatever the items' outcomes.
    pub fn score(&self) -> ReputationScore {
        self.score_against(&ItemOutcomes::default())
    }

    /// Sum the deltas, counting at most one per item known to `outcomes`: the
    /// one whose tick matches the item's outcome. Deltas for pending items
    /// count nothing. Deltas for items `outcomes` does not know count as-is.
    pub fn score_against(&self, outcomes: &ItemOutcomes) -> ReputationScore {
        let mut approvals = 0u64;
        let mut rejections = 0u64;
        let mut credited = HashSet::new();
        for ((tick, reason), amount) in &self.amounts {
            if let Some(id) = reason_item(reason) {
                let item_id = ItemId::new(id);
                if let Some(status) = outcomes.status(&item_id) {
                    let matches = status.outcome().map(DeltaTick::from) == Some(*tick);
                    if !matches || !credited.insert(item_id) {
                        continue;
                    }
                }
            }
            match tick {
                DeltaTick::Approval => approvals = approvals.saturating_add(*amount),
                DeltaTick::Rejection => rejections = rejections.saturating_add(*amount),
            }
        }
        ReputationScore::from_counts(approvals, rejections)
    }
}
