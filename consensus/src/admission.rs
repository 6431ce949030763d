//! Vote admission: accept or refuse a proposed vote against folded state.

use crate::error::AdmissionError;
use crate::fold::{FoldedLog, Submission};
use agora_types::{AgentId, ItemId, VoteDirection};

/// A vote someone wants to cast, not yet on the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateVote {
    pub item_id: ItemId,
    pub voter: AgentId,
    pub direction: VoteDirection,
}

/// Applies the admission rules. Purely local: no event is appended on refusal.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoteAdmission;

impl VoteAdmission {
    /// Check `candidate` against `log`, returning the item's submission on
    /// success.
    ///
    /// Rules, in order:
    /// 1. the item must exist;
    /// 2. the author may not vote on their own item;
    /// 3. a voter may vote at most once per item;
    /// 4. no votes once the item is finalized (recorded or implied by tallies).
    pub fn admit<'a>(
        &self,
        log: &'a FoldedLog,
        candidate: &CandidateVote,
    ) -> Result<&'a Submission, AdmissionError> {
        let submission = log
            .submission(&candidate.item_id)
            .ok_or_else(|| AdmissionError::ItemNotFound(candidate.item_id.clone()))?;

        if submission.author == candidate.voter {
            return Err(AdmissionError::SelfVoteForbidden {
                voter: candidate.voter.clone(),
            });
        }

        if log.has_voted(&candidate.item_id, &candidate.voter) {
            return Err(AdmissionError::DuplicateVote {
                item_id: candidate.item_id.clone(),
                voter: candidate.voter.clone(),
            });
        }

        if let Some(outcome) = log.status(&candidate.item_id).outcome() {
            return Err(AdmissionError::AlreadyFinalized {
                item_id: candidate.item_id.clone(),
                outcome,
            });
        }

        Ok(submission)
    }
}
