//! The knowledge engine: every operation re-reads and re-folds the ledger,
//! decides locally, then appends.
//!
//! There is no in-process mutable state between calls. Concurrent votes on
//! the same item can both pass admission; the fold ignores whichever one
//! lands after the threshold, so the derived outcome stays correct. Both may
//! leave a delta, and scores count only the one matching the fold.

use crate::committer::{FinalizationCommitter, VoteCommit};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::metrics::EngineMetrics;
use crate::views::{
    ActivityEntry, ActivityPage, ItemListing, ItemView, ReconcileReport, ReputationEffect,
    ReputationView, SubmitReceipt, SubmitRequest, VoteOutcome,
};
use agora_consensus::{
    CandidateVote, ConsensusEvaluator, EventFolder, FoldedLog, Submission, VoteAdmission,
};
use agora_directory::{AgentTopics, IdentityResolver, MaterializedDirectory, TopicDirectory};
use agora_ledger::{LedgerError, LedgerReader, TopicLedger};
use agora_messages::{encode, DeltaTick, ItemSubmitted, LedgerPayload, ReputationDelta};
use agora_reputation::{
    ContentEntry, DeltaSet, ItemOutcomes, ReputationLedger, ReputationSyncer, SyncRequest,
    SyncWarning,
};
use agora_types::{AgentId, Category, Clock, ItemId, Outcome, TopicId, VoteDirection};
use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Upper bound on one activity page.
pub const MAX_ACTIVITY_PAGE: usize = 100;

/// External collaborators, injected at construction.
#[derive(Clone)]
pub struct EngineDeps {
    pub ledger: Arc<dyn TopicLedger>,
    pub identity: Arc<dyn IdentityResolver>,
    /// `None` disables secondary mirroring.
    pub secondary: Option<Arc<dyn ReputationLedger>>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<EngineMetrics>,
}

/// One folded category topic.
struct CategoryFold {
    topic: TopicId,
    log: FoldedLog,
}

/// Per-author work collected during reconciliation.
#[derive(Default)]
struct AuthorCatchUp {
    deltas: DeltaSet,
    appended: Vec<ReputationDelta>,
    content: Vec<ContentEntry>,
}

pub struct KnowledgeEngine {
    config: EngineConfig,
    reader: LedgerReader,
    folder: EventFolder,
    evaluator: ConsensusEvaluator,
    committer: FinalizationCommitter,
    syncer: ReputationSyncer,
    identity: Arc<dyn IdentityResolver>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
}

impl KnowledgeEngine {
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Self {
        let reader = LedgerReader::with_limits(deps.ledger.clone(), config.page_size, config.max_pages);
        let committer =
            FinalizationCommitter::new(deps.ledger, deps.clock.clone(), config.activity_retry);
        let syncer = ReputationSyncer::new(reader.clone(), deps.secondary, config.read_after_write);
        Self {
            folder: EventFolder::new(config.params),
            evaluator: ConsensusEvaluator::new(config.params),
            reader,
            committer,
            syncer,
            identity: deps.identity,
            clock: deps.clock,
            metrics: deps.metrics,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    // ── Votes ──────────────────────────────────────────────────────────

    /// Resolve the caller, admit the vote, commit it and, on finalization,
    /// sync the author's reputation.
    pub async fn cast_vote(
        &self,
        credential: &str,
        item_id: &ItemId,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, EngineError> {
        let result = match self.identity.resolve(credential).await {
            Ok(voter) => self.cast_vote_as(&voter, item_id, direction).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            debug!(item = %item_id, reason = e.reason(), "vote refused");
            self.metrics.votes_rejected.with_label_values(&[e.reason()]).inc();
        }
        result
    }

    /// [`cast_vote`](Self::cast_vote) for an already-resolved voter.
    pub async fn cast_vote_as(
        &self,
        voter: &AgentId,
        item_id: &ItemId,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, EngineError> {
        let candidate = CandidateVote {
            item_id: item_id.clone(),
            voter: voter.clone(),
            direction,
        };

        let mut folds = self.fold_categories().await?;
        let index = folds
            .iter()
            .position(|fold| fold.log.contains(item_id))
            .ok_or_else(|| EngineError::ItemNotFound(item_id.clone()))?;
        let CategoryFold { topic, log } = folds.swap_remove(index);
        VoteAdmission.admit(&log, &candidate)?;

        // Re-check against the freshest read right before appending.
        let log = if self.config.recheck_before_append {
            let fresh = self.fold_topic(&topic).await?;
            VoteAdmission.admit(&fresh, &candidate)?;
            fresh
        } else {
            log
        };
        let submission = log
            .submission(item_id)
            .ok_or_else(|| EngineError::ItemNotFound(item_id.clone()))?;

        let evaluation = self.evaluator.evaluate(item_id, &log.votes_by_item, &candidate);
        let directory = self.directory().await?;
        let voter_topics = directory.resolve(voter);
        let author_topics = directory.resolve(&submission.author);
        let prior_voters = evaluation
            .outcome
            .outcome()
            .map(|outcome| log.finalizing_voters(item_id, outcome))
            .unwrap_or_default();

        let receipt = self
            .committer
            .commit(VoteCommit {
                category_topic: &topic,
                submission,
                voter,
                direction,
                evaluation,
                prior_voters,
                voter_topics: voter_topics.as_ref(),
                author_topics: author_topics.as_ref(),
            })
            .await?;
        self.metrics.votes_admitted.inc();

        let mut warnings = receipt.warnings;
        let reputation_effect = match &receipt.finalized {
            Some(finalized) => {
                self.metrics
                    .finalizations
                    .with_label_values(&[finalized.outcome.as_str()])
                    .inc();
                let outcomes = self
                    .settled_outcomes(&folds, &topic, &log, item_id, finalized.outcome)
                    .await;
                Some(
                    self.sync_finalized(
                        submission,
                        finalized.outcome,
                        receipt.delta.as_ref(),
                        author_topics.as_ref(),
                        &outcomes,
                        &mut warnings,
                    )
                    .await,
                )
            }
            None => None,
        };

        Ok(VoteOutcome {
            success: true,
            item_id: item_id.clone(),
            vote: direction,
            voter: voter.clone(),
            author: submission.author.clone(),
            approvals: evaluation.approvals,
            rejections: evaluation.rejections,
            status: evaluation.outcome,
            reputation_effect,
            warnings: self.report_warnings(warnings),
        })
    }

    async fn sync_finalized(
        &self,
        submission: &Submission,
        outcome: Outcome,
        delta: Option<&ReputationDelta>,
        author_topics: Option<&AgentTopics>,
        outcomes: &ItemOutcomes,
        warnings: &mut Vec<SyncWarning>,
    ) -> ReputationEffect {
        let mut effect = ReputationEffect {
            author: submission.author.clone(),
            credit: DeltaTick::from(outcome),
            delta_recorded: delta.is_some(),
            score: None,
        };
        let (Some(delta), Some(topics)) = (delta, author_topics) else {
            return effect;
        };
        self.metrics.deltas_emitted.inc();

        let approved_content = match outcome {
            Outcome::Approved => vec![self.content_entry(submission)],
            Outcome::Rejected => Vec::new(),
        };
        let request = SyncRequest {
            author: &submission.author,
            public_topic: &topics.public,
            appended_deltas: std::slice::from_ref(delta),
            outcomes,
            approved_content,
        };
        match self.syncer.sync(request).await {
            Ok(report) => {
                effect.score = Some(report.score);
                warnings.extend(report.warnings);
            }
            Err(e) => {
                warn!(author = %submission.author, error = %e, "reputation sync failed");
                warnings.push(SyncWarning::ReputationReadFailed {
                    agent: submission.author.clone(),
                    reason: e.to_string(),
                });
            }
        }
        effect
    }

    // ── Submissions ────────────────────────────────────────────────────

    pub async fn submit_item(
        &self,
        credential: &str,
        request: SubmitRequest,
    ) -> Result<SubmitReceipt, EngineError> {
        let author = self.identity.resolve(credential).await?;

        if request.item_id.as_str().trim().is_empty() {
            return Err(EngineError::InvalidRequest("itemId must not be empty".into()));
        }
        let has_pointer = request
            .content_pointer
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        if request.content.trim().is_empty() && !has_pointer {
            return Err(EngineError::InvalidRequest(
                "either content or contentPointer is required".into(),
            ));
        }
        let topic = self.category_topic(request.category)?;

        let folds = self.fold_categories().await?;
        if folds.iter().any(|fold| fold.log.contains(&request.item_id)) {
            return Err(EngineError::DuplicateItem(request.item_id));
        }

        let payload = LedgerPayload::ItemSubmitted(ItemSubmitted {
            item_id: request.item_id.clone(),
            author: author.clone(),
            category: request.category,
            content: request.content,
            content_pointer: request.content_pointer.filter(|p| !p.trim().is_empty()),
            timestamp: self.clock.now().to_iso(),
        });
        let sequence_number = self
            .reader
            .ledger()
            .append(topic, encode(&payload))
            .await
            .map_err(|e| EngineError::CommitFailed(format!("submission of {}: {e}", request.item_id)))?;

        self.metrics.submissions.inc();
        info!(item = %request.item_id, %author, category = %request.category, seq = sequence_number, "item submitted");
        Ok(SubmitReceipt {
            success: true,
            item_id: request.item_id,
            author,
            category: request.category,
            sequence_number,
        })
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Every item in every configured category, grouped by status.
    pub async fn list_items(&self) -> Result<ItemListing, EngineError> {
        let mut listing = ItemListing::default();
        for fold in self.fold_categories().await? {
            for snapshot in fold.log.snapshots() {
                listing.push(ItemView::from(snapshot));
            }
        }
        Ok(listing)
    }

    /// Derived reputation for `agent` plus the secondary ledger's cached copy.
    pub async fn reputation(&self, agent: &AgentId) -> Result<ReputationView, EngineError> {
        let directory = self.directory().await?;
        let topics = directory
            .resolve(agent)
            .ok_or_else(|| EngineError::UnknownAgent(agent.clone()))?;
        let outcomes = outcomes_of(&self.fold_categories().await?);
        let score = self
            .syncer
            .score(&topics.public, &outcomes)
            .await
            .map_err(|e| self.read_failed(&topics.public, e))?;

        let mut warnings = Vec::new();
        let secondary = match self.syncer.secondary_record(agent).await {
            Ok(record) => record,
            Err(e) => {
                warnings.push(SyncWarning::SecondaryLedgerSyncFailed {
                    agent: agent.clone(),
                    operation: "record",
                    reason: e.to_string(),
                });
                None
            }
        };

        Ok(ReputationView {
            agent: agent.clone(),
            public_topic: topics.public,
            score,
            secondary,
            warnings: self.report_warnings(warnings),
        })
    }

    /// One page of decoded events from any topic.
    pub async fn activity(
        &self,
        topic: &TopicId,
        after: Option<u64>,
        count: usize,
    ) -> Result<ActivityPage, EngineError> {
        let count = count.clamp(1, MAX_ACTIVITY_PAGE);
        let page = self
            .reader
            .fetch_page(topic, after, count)
            .await
            .map_err(|e| self.read_failed(topic, e))?;
        Ok(ActivityPage {
            topic_id: topic.clone(),
            entries: page.events.iter().map(ActivityEntry::from).collect(),
            next_after: if page.exhausted { None } else { page.last_sequence },
        })
    }

    // ── Reconciliation ─────────────────────────────────────────────────

    /// Catch up every terminal item: append missing `finalized` events and
    /// reputation deltas, then re-sync each affected author once.
    pub async fn reconcile(&self) -> Result<ReconcileReport, EngineError> {
        let folds = self.fold_categories().await?;
        let outcomes = outcomes_of(&folds);
        let directory = self.directory().await?;
        let mut report = ReconcileReport::default();
        let mut warnings = Vec::new();
        let mut authors: BTreeMap<AgentId, (AgentTopics, AuthorCatchUp)> = BTreeMap::new();

        for fold in &folds {
            for snapshot in fold.log.snapshots() {
                report.items_checked += 1;
                let Some(outcome) = snapshot.status.outcome() else {
                    continue;
                };
                let submission = snapshot.submission;
                let item_id = &submission.item_id;

                if let Some(missing) = fold.log.missing_finalization(item_id) {
                    let voters = fold.log.finalizing_voters(item_id, missing);
                    match self
                        .committer
                        .append_finalized(&fold.topic, submission, missing, voters)
                        .await
                    {
                        Ok(_) => {
                            report.finalized_emitted += 1;
                            self.metrics
                                .finalizations
                                .with_label_values(&[missing.as_str()])
                                .inc();
                        }
                        Err(e) => {
                            warnings.push(SyncWarning::FinalizationAppendFailed {
                                item_id: item_id.clone(),
                                reason: e.to_string(),
                            });
                            continue;
                        }
                    }
                }

                let Some(topics) = directory.resolve(&submission.author) else {
                    warnings.push(SyncWarning::AuthorTopicMissing {
                        agent: submission.author.clone(),
                    });
                    continue;
                };
                if !authors.contains_key(&submission.author) {
                    let deltas = self
                        .syncer
                        .deltas(&topics.public)
                        .await
                        .map_err(|e| self.read_failed(&topics.public, e))?;
                    let catch_up = AuthorCatchUp {
                        deltas,
                        ..AuthorCatchUp::default()
                    };
                    authors.insert(submission.author.clone(), (topics.clone(), catch_up));
                }
                let Some((topics, catch_up)) = authors.get_mut(&submission.author) else {
                    continue;
                };

                if !catch_up.deltas.credits(DeltaTick::from(outcome), item_id) {
                    match self.committer.append_delta(&topics.public, outcome, item_id).await {
                        Ok(delta) => {
                            report.deltas_emitted += 1;
                            self.metrics.deltas_emitted.inc();
                            catch_up.appended.push(delta);
                        }
                        Err(e) => warnings.push(SyncWarning::DeltaAppendFailed {
                            item_id: item_id.clone(),
                            reason: e.to_string(),
                        }),
                    }
                }
                if outcome == Outcome::Approved {
                    catch_up.content.push(self.content_entry(submission));
                }
            }
        }

        for (author, (topics, catch_up)) in &authors {
            let request = SyncRequest {
                author,
                public_topic: &topics.public,
                appended_deltas: &catch_up.appended,
                outcomes: &outcomes,
                approved_content: catch_up.content.clone(),
            };
            match self.syncer.sync(request).await {
                Ok(sync) => {
                    report.authors_synced += 1;
                    warnings.extend(sync.warnings);
                }
                Err(e) => warnings.push(SyncWarning::ReputationReadFailed {
                    agent: author.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        report.warnings = self.report_warnings(warnings);
        info!(
            items = report.items_checked,
            finalized = report.finalized_emitted,
            deltas = report.deltas_emitted,
            authors = report.authors_synced,
            "reconciliation complete"
        );
        Ok(report)
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn category_topic(&self, category: Category) -> Result<&TopicId, EngineError> {
        self.config.category_topics.get(&category).ok_or_else(|| {
            EngineError::InvalidRequest(format!("no topic configured for category {category}"))
        })
    }

    async fn fold_topic(&self, topic: &TopicId) -> Result<FoldedLog, EngineError> {
        let started = Instant::now();
        let events = self
            .reader
            .fetch_all(topic)
            .await
            .map_err(|e| self.read_failed(topic, e))?;
        let log = self.folder.fold(&events);
        self.metrics
            .fold_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        debug!(topic = %topic, events = events.len(), items = log.len(), ignored = log.ignored_events, "topic folded");
        Ok(log)
    }

    /// Fold every category topic concurrently.
    async fn fold_categories(&self) -> Result<Vec<CategoryFold>, EngineError> {
        let folds = self.config.category_topics.values().map(|topic| async move {
            let log = self.fold_topic(topic).await?;
            Ok::<_, EngineError>(CategoryFold {
                topic: topic.clone(),
                log,
            })
        });
        try_join_all(folds).await
    }

    /// Outcomes to count deltas against after finalizing `item_id` on `topic`.
    ///
    /// The topic is re-read so that a finalization racing this one from a
    /// stale fold is seen. If the re-read fails, or still shows the item
    /// pending, the outcome just committed stands.
    async fn settled_outcomes(
        &self,
        others: &[CategoryFold],
        topic: &TopicId,
        committed_from: &FoldedLog,
        item_id: &ItemId,
        committed: Outcome,
    ) -> ItemOutcomes {
        let mut outcomes = outcomes_of(others);
        match self.fold_topic(topic).await {
            Ok(fresh) => record_statuses(&mut outcomes, &fresh),
            Err(_) => record_statuses(&mut outcomes, committed_from),
        }
        if outcomes.status(item_id).and_then(|s| s.outcome()).is_some_and(|o| o != committed) {
            info!(item = %item_id, %committed, "item was finalized the other way by a concurrent vote");
        }
        outcomes.settle(item_id, committed);
        outcomes
    }

    async fn directory(&self) -> Result<MaterializedDirectory, EngineError> {
        MaterializedDirectory::load(
            &self.reader,
            self.config.discovery_topic.as_ref(),
            &self.config.directory_overrides,
        )
        .await
        .map_err(|e| {
            self.metrics.ledger_read_failures.inc();
            warn!(error = %e, "discovery topic read failed");
            EngineError::from(e)
        })
    }

    fn read_failed(&self, topic: &TopicId, e: LedgerError) -> EngineError {
        self.metrics.ledger_read_failures.inc();
        warn!(topic = %topic, error = %e, "ledger read failed");
        EngineError::from(e)
    }

    fn content_entry(&self, submission: &Submission) -> ContentEntry {
        ContentEntry {
            item_id: submission.item_id.clone(),
            category: submission.category,
            pointer: submission
                .content_pointer
                .clone()
                .unwrap_or_else(|| submission.item_id.to_string()),
            approved_at: self.clock.now().to_iso(),
        }
    }

    /// Count warnings by code and render them for a response.
    fn report_warnings(&self, warnings: Vec<SyncWarning>) -> Vec<String> {
        warnings
            .into_iter()
            .map(|w| {
                self.metrics.sync_warnings.with_label_values(&[w.code()]).inc();
                w.to_string()
            })
            .collect()
    }
}

fn record_statuses(outcomes: &mut ItemOutcomes, log: &FoldedLog) {
    for item_id in log.submissions.keys() {
        outcomes.record(item_id.clone(), log.status(item_id));
    }
}

fn outcomes_of(folds: &[CategoryFold]) -> ItemOutcomes {
    let mut outcomes = ItemOutcomes::default();
    for fold in folds {
        record_statuses(&mut outcomes, &fold.log);
    }
    outcomes
}
