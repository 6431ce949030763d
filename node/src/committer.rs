//! Finalization commit: the two-phase append that records a vote and, once a
//! threshold is crossed, the item's outcome and the author's reputation delta.
//!
//! The appends are not a transaction. If the process dies between the
//! `finalized` event and the delta, the next reconciliation finds a terminal
//! item without a matching delta and re-emits it; derivation collapses any
//! duplicate, so re-emission is always safe.

use crate::error::EngineError;
use agora_consensus::{Evaluation, Submission};
use agora_directory::AgentTopics;
use agora_ledger::{LedgerError, RetryPolicy, TopicLedger};
use agora_messages::{encode, ItemFinalized, ItemVoted, LedgerPayload, ReputationDelta, VoteCast};
use agora_reputation::SyncWarning;
use agora_types::{AgentId, Clock, ItemId, Outcome, TopicId, VoteDirection};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the committer needs to record one admitted vote.
#[derive(Clone, Debug)]
pub struct VoteCommit<'a> {
    pub category_topic: &'a TopicId,
    pub submission: &'a Submission,
    pub voter: &'a AgentId,
    pub direction: VoteDirection,
    pub evaluation: Evaluation,
    /// Voters already counted in the vote's direction, in log order.
    pub prior_voters: Vec<AgentId>,
    pub voter_topics: Option<&'a AgentTopics>,
    pub author_topics: Option<&'a AgentTopics>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizedRecord {
    pub outcome: Outcome,
    pub sequence_number: u64,
    pub voters: Vec<AgentId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    pub vote_sequence: u64,
    pub finalized: Option<FinalizedRecord>,
    /// The delta appended to the author's public topic, if it was.
    pub delta: Option<ReputationDelta>,
    pub warnings: Vec<SyncWarning>,
}

pub struct FinalizationCommitter {
    ledger: Arc<dyn TopicLedger>,
    clock: Arc<dyn Clock>,
    activity_retry: RetryPolicy,
}

impl FinalizationCommitter {
    pub fn new(ledger: Arc<dyn TopicLedger>, clock: Arc<dyn Clock>, activity_retry: RetryPolicy) -> Self {
        Self {
            ledger,
            clock,
            activity_retry,
        }
    }

    /// Record an admitted vote and, on a threshold crossing, its consequences.
    ///
    /// Fails only if the vote or the `finalized` event could not be appended.
    /// Activity and delta failures become warnings on the receipt.
    pub async fn commit(&self, vote: VoteCommit<'_>) -> Result<CommitReceipt, EngineError> {
        let item_id = &vote.submission.item_id;
        let mut warnings = Vec::new();

        let vote_sequence = self
            .append_vote(vote.category_topic, item_id, vote.voter, vote.direction)
            .await
            .map_err(|e| EngineError::CommitFailed(format!("vote on {item_id}: {e}")))?;

        match vote.voter_topics {
            Some(topics) => {
                if let Err(e) = self
                    .record_activity(&topics.personal, vote.submission, vote.direction)
                    .await
                {
                    warn!(voter = %vote.voter, error = %e, "activity record not appended");
                    warnings.push(SyncWarning::ActivityAppendFailed {
                        agent: vote.voter.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            None => warnings.push(SyncWarning::VoterTopicMissing {
                agent: vote.voter.clone(),
            }),
        }

        let Some(outcome) = vote.evaluation.outcome.outcome() else {
            return Ok(CommitReceipt {
                vote_sequence,
                finalized: None,
                delta: None,
                warnings,
            });
        };

        let mut voters = vote.prior_voters;
        voters.push(vote.voter.clone());
        let sequence_number = self
            .append_finalized(vote.category_topic, vote.submission, outcome, voters.clone())
            .await
            .map_err(|e| EngineError::CommitFailed(format!("finalization of {item_id}: {e}")))?;

        let delta = match vote.author_topics {
            Some(topics) => match self.append_delta(&topics.public, outcome, item_id).await {
                Ok(delta) => Some(delta),
                Err(e) => {
                    warn!(item = %item_id, error = %e, "reputation delta not appended");
                    warnings.push(SyncWarning::DeltaAppendFailed {
                        item_id: item_id.clone(),
                        reason: e.to_string(),
                    });
                    None
                }
            },
            None => {
                warn!(item = %item_id, author = %vote.submission.author, "author has no public topic");
                warnings.push(SyncWarning::AuthorTopicMissing {
                    agent: vote.submission.author.clone(),
                });
                None
            }
        };

        Ok(CommitReceipt {
            vote_sequence,
            finalized: Some(FinalizedRecord {
                outcome,
                sequence_number,
                voters,
            }),
            delta,
            warnings,
        })
    }

    /// Append a vote event. Never retried: a duplicate vote append would be
    /// ignored by the fold but still pollute the log.
    pub async fn append_vote(
        &self,
        topic: &TopicId,
        item_id: &ItemId,
        voter: &AgentId,
        direction: VoteDirection,
    ) -> Result<u64, LedgerError> {
        let payload = LedgerPayload::ItemVoted(ItemVoted::new(
            item_id.clone(),
            voter.clone(),
            direction,
            self.clock.now(),
        ));
        let seq = self.ledger.append(topic, encode(&payload)).await?;
        info!(item = %item_id, %voter, vote = %direction, seq, "vote appended");
        Ok(seq)
    }

    /// Append the voter's "I voted" record, retrying transient failures.
    pub async fn record_activity(
        &self,
        personal_topic: &TopicId,
        submission: &Submission,
        direction: VoteDirection,
    ) -> Result<u64, LedgerError> {
        let payload = LedgerPayload::VoteCast(VoteCast {
            item_id: submission.item_id.clone(),
            author: submission.author.clone(),
            category: submission.category,
            vote: direction,
            timestamp: self.clock.now().to_iso(),
        });
        let contents = encode(&payload);
        self.activity_retry
            .run(|| self.ledger.append(personal_topic, contents.clone()))
            .await
    }

    pub async fn append_finalized(
        &self,
        topic: &TopicId,
        submission: &Submission,
        outcome: Outcome,
        voters: Vec<AgentId>,
    ) -> Result<u64, LedgerError> {
        let payload = LedgerPayload::ItemFinalized(ItemFinalized::new(
            outcome,
            submission.item_id.clone(),
            submission.author.clone(),
            voters,
            self.clock.now(),
        ));
        let seq = self.ledger.append(topic, encode(&payload)).await?;
        info!(item = %submission.item_id, %outcome, seq, "item finalized");
        Ok(seq)
    }

    /// Append a `+1` delta for `outcome` to an author's public topic.
    pub async fn append_delta(
        &self,
        public_topic: &TopicId,
        outcome: Outcome,
        item_id: &ItemId,
    ) -> Result<ReputationDelta, LedgerError> {
        let delta = ReputationDelta::for_outcome(outcome, item_id, self.clock.now());
        let payload = LedgerPayload::ReputationDelta(delta.clone());
        let seq = self.ledger.append(public_topic, encode(&payload)).await?;
        info!(topic = %public_topic, reason = %delta.reason, seq, "reputation delta appended");
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{InMemoryLedger, NullClock};
    use agora_types::{Category, ConsensusTimestamp, ItemStatus};
    use std::time::Duration;

    fn submission() -> Submission {
        Submission {
            item_id: ItemId::new("kb-1"),
            author: AgentId::new("alice"),
            category: Category::Research,
            content: "c".into(),
            content_pointer: None,
            created_at: String::new(),
            sequence_number: 1,
            consensus_timestamp: ConsensusTimestamp::default(),
        }
    }

    fn topics(personal: &str, public: &str) -> AgentTopics {
        AgentTopics {
            personal: TopicId::new(personal),
            public: TopicId::new(public),
        }
    }

    fn committer(ledger: &Arc<InMemoryLedger>) -> FinalizationCommitter {
        FinalizationCommitter::new(
            ledger.clone(),
            Arc::new(NullClock::default()),
            RetryPolicy::new(3, Duration::from_millis(1)),
        )
    }

    fn evaluation(approvals: u32, outcome: ItemStatus) -> Evaluation {
        Evaluation {
            approvals,
            rejections: 0,
            outcome,
        }
    }

    #[tokio::test]
    async fn pending_vote_appends_vote_and_activity_only() {
        let ledger = Arc::new(InMemoryLedger::new());
        let category = TopicId::new("0.0.10");
        let sub = submission();
        let bob = AgentId::new("bob");
        let bob_topics = topics("0.0.20", "0.0.21");
        let receipt = committer(&ledger)
            .commit(VoteCommit {
                category_topic: &category,
                submission: &sub,
                voter: &bob,
                direction: VoteDirection::Approve,
                evaluation: evaluation(1, ItemStatus::Pending),
                prior_voters: vec![],
                voter_topics: Some(&bob_topics),
                author_topics: None,
            })
            .await
            .unwrap();

        assert!(receipt.finalized.is_none());
        assert!(receipt.warnings.is_empty());
        assert_eq!(ledger.message_count(&category), 1);
        assert!(matches!(
            ledger.payloads(&bob_topics.personal)[0],
            LedgerPayload::VoteCast(_)
        ));
    }

    #[tokio::test]
    async fn threshold_crossing_appends_finalized_and_delta() {
        let ledger = Arc::new(InMemoryLedger::new());
        let category = TopicId::new("0.0.10");
        let sub = submission();
        let carol = AgentId::new("carol");
        let carol_topics = topics("0.0.30", "0.0.31");
        let alice_topics = topics("0.0.40", "0.0.41");
        let receipt = committer(&ledger)
            .commit(VoteCommit {
                category_topic: &category,
                submission: &sub,
                voter: &carol,
                direction: VoteDirection::Approve,
                evaluation: evaluation(2, ItemStatus::Approved),
                prior_voters: vec![AgentId::new("bob")],
                voter_topics: Some(&carol_topics),
                author_topics: Some(&alice_topics),
            })
            .await
            .unwrap();

        let finalized = receipt.finalized.unwrap();
        assert_eq!(finalized.outcome, Outcome::Approved);
        assert_eq!(finalized.voters, vec![AgentId::new("bob"), AgentId::new("carol")]);
        assert_eq!(receipt.delta.unwrap().reason, "item_approved:kb-1");

        let payloads = ledger.payloads(&category);
        assert_eq!(payloads.len(), 2);
        assert!(matches!(payloads[1], LedgerPayload::ItemFinalized(_)));
        assert!(matches!(
            ledger.payloads(&alice_topics.public)[0],
            LedgerPayload::ReputationDelta(_)
        ));
    }

    #[tokio::test]
    async fn vote_append_failure_is_a_commit_failure() {
        let ledger = Arc::new(InMemoryLedger::new());
        let category = TopicId::new("0.0.10");
        ledger.fail_appends_to(&category);
        let sub = submission();
        let bob = AgentId::new("bob");
        let err = committer(&ledger)
            .commit(VoteCommit {
                category_topic: &category,
                submission: &sub,
                voter: &bob,
                direction: VoteDirection::Reject,
                evaluation: evaluation(0, ItemStatus::Pending),
                prior_voters: vec![],
                voter_topics: None,
                author_topics: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CommitFailed(_)));
    }

    #[tokio::test]
    async fn activity_is_retried_then_downgraded() {
        let ledger = Arc::new(InMemoryLedger::new());
        let category = TopicId::new("0.0.10");
        let bob_topics = topics("0.0.20", "0.0.21");
        let sub = submission();
        let bob = AgentId::new("bob");

        ledger.fail_next_appends(&bob_topics.personal, 2);
        let receipt = committer(&ledger)
            .commit(VoteCommit {
                category_topic: &category,
                submission: &sub,
                voter: &bob,
                direction: VoteDirection::Approve,
                evaluation: evaluation(1, ItemStatus::Pending),
                prior_voters: vec![],
                voter_topics: Some(&bob_topics),
                author_topics: None,
            })
            .await
            .unwrap();
        assert!(receipt.warnings.is_empty());
        assert_eq!(ledger.message_count(&bob_topics.personal), 1);

        ledger.fail_appends_to(&bob_topics.personal);
        let receipt = committer(&ledger)
            .commit(VoteCommit {
                category_topic: &category,
                submission: &sub,
                voter: &bob,
                direction: VoteDirection::Approve,
                evaluation: evaluation(1, ItemStatus::Pending),
                prior_voters: vec![],
                voter_topics: Some(&bob_topics),
                author_topics: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt.warnings[0].code(), "activity_append_failed");
    }

    #[tokio::test]
    async fn missing_author_topic_defers_the_delta() {
        let ledger = Arc::new(InMemoryLedger::new());
        let category = TopicId::new("0.0.10");
        let sub = submission();
        let carol = AgentId::new("carol");
        let receipt = committer(&ledger)
            .commit(VoteCommit {
                category_topic: &category,
                submission: &sub,
                voter: &carol,
                direction: VoteDirection::Reject,
                evaluation: Evaluation {
                    approvals: 0,
                    rejections: 2,
                    outcome: ItemStatus::Rejected,
                },
                prior_voters: vec![AgentId::new("bob")],
                voter_topics: None,
                author_topics: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt.finalized.unwrap().outcome, Outcome::Rejected);
        assert!(receipt.delta.is_none());
        let codes: Vec<_> = receipt.warnings.iter().map(SyncWarning::code).collect();
        assert_eq!(codes, vec!["voter_topic_missing", "author_topic_missing"]);
    }
}
