//! Event folding: replay a category topic into per-item aggregates.
//!
//! The fold is a pure function of the event sequence. It applies the same
//! rules admission enforces, so a vote that slipped into the log through a
//! race (or was written by a third party) never counts:
//! - a vote for an item not yet submitted is ignored;
//! - a self-vote is ignored;
//! - only a voter's first vote on an item counts;
//! - nothing counts once the item has a `finalized` event or its tallies have
//!   already crossed the threshold.
//!
//! A repeated submission or finalization for the same item is ignored: the
//! first one wins. A finalization that contradicts tallies which already
//! crossed the threshold is ignored as well.

use crate::evaluator::Tally;
use agora_ledger::Event;
use agora_messages::LedgerPayload;
use agora_types::{
    AgentId, Category, ConsensusParams, ConsensusTimestamp, ItemId, ItemStatus, Outcome,
    VoteDirection,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A submitted knowledge item, as recorded on its category topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub item_id: ItemId,
    pub author: AgentId,
    pub category: Category,
    pub content: String,
    pub content_pointer: Option<String>,
    /// Payload timestamp written by the submitter.
    pub created_at: String,
    pub sequence_number: u64,
    pub consensus_timestamp: ConsensusTimestamp,
}

/// A vote that counts towards an item's tallies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastVote {
    pub voter: AgentId,
    pub direction: VoteDirection,
    pub timestamp: String,
    pub sequence_number: u64,
}

/// The terminal event recorded for an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finalization {
    pub outcome: Outcome,
    pub voters: Vec<AgentId>,
    pub timestamp: String,
    pub sequence_number: u64,
}

/// Aggregates for every item on one category topic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FoldedLog {
    pub submissions: HashMap<ItemId, Submission>,
    pub votes_by_item: HashMap<ItemId, Vec<CastVote>>,
    pub finalized_by_item: HashMap<ItemId, Finalization>,
    /// Items in submission order.
    order: Vec<ItemId>,
    /// Log entries that were read but did not count.
    pub ignored_events: usize,
    threshold: u32,
}

/// Everything a listing or a vote response needs about one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemSnapshot<'a> {
    pub submission: &'a Submission,
    pub tally: Tally,
    pub voters: Vec<AgentId>,
    pub status: ItemStatus,
    pub finalization: Option<&'a Finalization>,
}

impl FoldedLog {
    fn new(threshold: u32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.submissions.contains_key(item_id)
    }

    pub fn submission(&self, item_id: &ItemId) -> Option<&Submission> {
        self.submissions.get(item_id)
    }

    pub fn votes(&self, item_id: &ItemId) -> &[CastVote] {
        self.votes_by_item
            .get(item_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn tally(&self, item_id: &ItemId) -> Tally {
        Tally::from_votes(self.votes(item_id))
    }

    pub fn has_voted(&self, item_id: &ItemId, voter: &AgentId) -> bool {
        self.votes(item_id).iter().any(|v| &v.voter == voter)
    }

    /// Current status: the recorded finalization if any, else what the
    /// counted tallies imply.
    pub fn status(&self, item_id: &ItemId) -> ItemStatus {
        match self.finalized_by_item.get(item_id) {
            Some(fin) => fin.outcome.into(),
            None => self.tally(item_id).status(self.threshold),
        }
    }

    /// The outcome of an item whose tallies crossed the threshold but whose
    /// `finalized` event never made it to the log.
    pub fn missing_finalization(&self, item_id: &ItemId) -> Option<Outcome> {
        if self.finalized_by_item.contains_key(item_id) {
            return None;
        }
        self.tally(item_id).status(self.threshold).outcome()
    }

    /// Voters whose votes produced `outcome`, in log order.
    pub fn finalizing_voters(&self, item_id: &ItemId, outcome: Outcome) -> Vec<AgentId> {
        self.votes(item_id)
            .iter()
            .filter(|v| v.direction == outcome.direction())
            .map(|v| v.voter.clone())
            .collect()
    }

    pub fn snapshot(&self, item_id: &ItemId) -> Option<ItemSnapshot<'_>> {
        let submission = self.submissions.get(item_id)?;
        let votes = self.votes(item_id);
        Some(ItemSnapshot {
            submission,
            tally: Tally::from_votes(votes),
            voters: votes.iter().map(|v| v.voter.clone()).collect(),
            status: self.status(item_id),
            finalization: self.finalized_by_item.get(item_id),
        })
    }

    /// Snapshots of every submitted item, in submission order.
    pub fn snapshots(&self) -> impl Iterator<Item = ItemSnapshot<'_>> + '_ {
        self.order.iter().filter_map(move |id| self.snapshot(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn apply(&mut self, event: &Event) {
        match &event.payload {
            LedgerPayload::ItemSubmitted(sub) => {
                if self.submissions.contains_key(&sub.item_id) {
                    debug!(item = %sub.item_id, seq = event.sequence_number, "duplicate submission ignored");
                    self.ignored_events += 1;
                    return;
                }
                self.order.push(sub.item_id.clone());
                self.submissions.insert(
                    sub.item_id.clone(),
                    Submission {
                        item_id: sub.item_id.clone(),
                        author: sub.author.clone(),
                        category: sub.category,
                        content: sub.content.clone(),
                        content_pointer: sub.content_pointer.clone(),
                        created_at: sub.timestamp.clone(),
                        sequence_number: event.sequence_number,
                        consensus_timestamp: event.consensus_timestamp,
                    },
                );
            }
            LedgerPayload::ItemVoted(vote) => {
                let Some(submission) = self.submissions.get(&vote.item_id) else {
                    debug!(item = %vote.item_id, seq = event.sequence_number, "vote before submission ignored");
                    self.ignored_events += 1;
                    return;
                };
                if submission.author == vote.voter {
                    warn!(item = %vote.item_id, voter = %vote.voter, "self-vote in log ignored");
                    self.ignored_events += 1;
                    return;
                }
                if self.has_voted(&vote.item_id, &vote.voter) {
                    debug!(item = %vote.item_id, voter = %vote.voter, "repeat vote ignored");
                    self.ignored_events += 1;
                    return;
                }
                if self.status(&vote.item_id).is_terminal() {
                    debug!(item = %vote.item_id, voter = %vote.voter, "vote after finalization ignored");
                    self.ignored_events += 1;
                    return;
                }
                self.votes_by_item
                    .entry(vote.item_id.clone())
                    .or_default()
                    .push(CastVote {
                        voter: vote.voter.clone(),
                        direction: vote.vote,
                        timestamp: vote.timestamp.clone(),
                        sequence_number: event.sequence_number,
                    });
            }
            LedgerPayload::ItemFinalized(fin) => {
                let item_id = fin.item_id();
                if self.finalized_by_item.contains_key(item_id) {
                    debug!(item = %item_id, seq = event.sequence_number, "stray duplicate finalization ignored");
                    self.ignored_events += 1;
                    return;
                }
                if !self.submissions.contains_key(item_id) {
                    debug!(item = %item_id, seq = event.sequence_number, "finalization of unknown item ignored");
                    self.ignored_events += 1;
                    return;
                }
                if let Some(implied) = self.tally(item_id).status(self.threshold).outcome() {
                    if implied != fin.outcome {
                        warn!(item = %item_id, recorded = %fin.outcome, %implied, "finalization contradicts tallies, ignored");
                        self.ignored_events += 1;
                        return;
                    }
                }
                self.finalized_by_item.insert(
                    item_id.clone(),
                    Finalization {
                        outcome: fin.outcome,
                        voters: fin.body.voters.clone(),
                        timestamp: fin.body.timestamp.clone(),
                        sequence_number: event.sequence_number,
                    },
                );
            }
            // Records of other topics; never part of an item fold.
            LedgerPayload::ReputationDelta(_)
            | LedgerPayload::VoteCast(_)
            | LedgerPayload::AgentRegistered(_) => {
                self.ignored_events += 1;
            }
        }
    }
}

/// Replays events into a [`FoldedLog`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EventFolder {
    params: ConsensusParams,
}

impl EventFolder {
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    /// Fold an ordered event sequence. Deterministic: the same sequence always
    /// yields the same aggregates.
    pub fn fold<'a>(&self, events: impl IntoIterator<Item = &'a Event>) -> FoldedLog {
        let mut log = FoldedLog::new(self.params.threshold);
        for event in events {
            log.apply(event);
        }
        log
    }
}
