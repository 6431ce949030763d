//! Threshold evaluation over approve/reject tallies.

use crate::admission::CandidateVote;
use crate::fold::CastVote;
use agora_types::{ConsensusParams, ItemId, ItemStatus, VoteDirection};
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;

/// Running approve/reject counts for one item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub approvals: u32,
    pub rejections: u32,
}

impl Tally {
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a CastVote>) -> Self {
        let mut tally = Self::default();
        for vote in votes {
            tally.add(vote.direction);
        }
        tally
    }

    pub fn add(&mut self, direction: VoteDirection) {
        match direction {
            VoteDirection::Approve => self.approvals += 1,
            VoteDirection::Reject => self.rejections += 1,
        }
    }

    pub fn with(mut self, direction: VoteDirection) -> Self {
        self.add(direction);
        self
    }

    pub fn count(&self, direction: VoteDirection) -> u32 {
        match direction {
            VoteDirection::Approve => self.approvals,
            VoteDirection::Reject => self.rejections,
        }
    }

    /// The status these counts imply under `threshold`.
    ///
    /// A single vote moves exactly one count, so both sides can only cross
    /// together if the log was folded incorrectly. Approval is taken as
    /// authoritative in that case and the violation is logged.
    pub fn status(&self, threshold: u32) -> ItemStatus {
        let approved = self.approvals >= threshold;
        let rejected = self.rejections >= threshold;
        if approved && rejected {
            error!(
                approvals = self.approvals,
                rejections = self.rejections,
                threshold,
                "invariant violated: both tallies crossed the threshold"
            );
        }
        if approved {
            ItemStatus::Approved
        } else if rejected {
            ItemStatus::Rejected
        } else {
            ItemStatus::Pending
        }
    }
}

/// Result of tallying an item with one newly admitted vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub approvals: u32,
    pub rejections: u32,
    pub outcome: ItemStatus,
}

/// Detects threshold crossings.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsensusEvaluator {
    params: ConsensusParams,
}

impl ConsensusEvaluator {
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    pub fn threshold(&self) -> u32 {
        self.params.threshold
    }

    /// Tally the existing counted votes on `item_id` plus `new_vote`.
    pub fn evaluate(
        &self,
        item_id: &ItemId,
        votes_by_item: &HashMap<ItemId, Vec<CastVote>>,
        new_vote: &CandidateVote,
    ) -> Evaluation {
        let existing = votes_by_item
            .get(item_id)
            .map(|votes| Tally::from_votes(votes))
            .unwrap_or_default();
        let tally = existing.with(new_vote.direction);
        Evaluation {
            approvals: tally.approvals,
            rejections: tally.rejections,
            outcome: tally.status(self.params.threshold),
        }
    }
}
