//! Re-derive an author's reputation and mirror it to the secondary ledger.

use crate::derive::{DeltaSet, ItemOutcomes, ReputationScore};
use crate::error::{SyncError, SyncWarning};
use crate::secondary::{ContentEntry, ReputationLedger, ReputationRecord};
use agora_ledger::{LedgerError, LedgerReader};
use agora_messages::ReputationDelta;
use agora_types::{AgentId, TopicId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a freshly appended delta is counted when the ledger mirror lags
/// behind the append.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadAfterWrite {
    /// Union the observed deltas with the one just appended. The union is
    /// keyed by `(tick, reason)`, so a delta that is already visible is not
    /// counted a second time.
    #[default]
    Optimistic,
    /// Re-read up to `attempts` times until the delta shows up, then fall back
    /// to the optimistic union with a warning.
    Poll { attempts: u32, interval: Duration },
}

/// Input to one [`ReputationSyncer::sync`] pass.
#[derive(Clone, Debug)]
pub struct SyncRequest<'a> {
    pub author: &'a AgentId,
    pub public_topic: &'a TopicId,
    /// Deltas the caller just appended to `public_topic`.
    pub appended_deltas: &'a [ReputationDelta],
    /// Folded item outcomes the deltas are counted against.
    pub outcomes: &'a ItemOutcomes,
    /// Approved content to publish on the author's list.
    pub approved_content: Vec<ContentEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub agent: AgentId,
    pub score: ReputationScore,
    /// Distinct deltas on the topic, including optimistically assumed ones.
    pub deltas_counted: usize,
    /// Appended deltas counted without being observed.
    pub assumed_deltas: usize,
    pub warnings: Vec<SyncWarning>,
}

/// Recomputes reputation from the primary ledger and pushes it to the
/// secondary ledger.
///
/// The score is always recounted from scratch. Secondary ledger failures are
/// reported as [`SyncWarning`]s and never as errors; only a failed read of
/// the primary ledger fails a sync.
#[derive(Clone)]
pub struct ReputationSyncer {
    reader: LedgerReader,
    secondary: Option<Arc<dyn ReputationLedger>>,
    read_after_write: ReadAfterWrite,
}

impl ReputationSyncer {
    pub fn new(
        reader: LedgerReader,
        secondary: Option<Arc<dyn ReputationLedger>>,
        read_after_write: ReadAfterWrite,
    ) -> Self {
        Self {
            reader,
            secondary,
            read_after_write,
        }
    }

    pub fn read_after_write(&self) -> ReadAfterWrite {
        self.read_after_write
    }

    /// Distinct deltas on a public topic.
    pub async fn deltas(&self, public_topic: &TopicId) -> Result<DeltaSet, LedgerError> {
        let events = self.reader.fetch_all(public_topic).await?;
        Ok(DeltaSet::from_events(&events))
    }

    /// Derived score, without touching the secondary ledger.
    pub async fn score(
        &self,
        public_topic: &TopicId,
        outcomes: &ItemOutcomes,
    ) -> Result<ReputationScore, LedgerError> {
        Ok(self.deltas(public_topic).await?.score_against(outcomes))
    }

    /// The cached secondary record, if a secondary ledger is configured.
    pub async fn secondary_record(
        &self,
        agent: &AgentId,
    ) -> Result<Option<ReputationRecord>, SyncError> {
        match &self.secondary {
            Some(secondary) => secondary.record(agent).await,
            None => Ok(None),
        }
    }

    pub async fn sync(&self, request: SyncRequest<'_>) -> Result<SyncReport, SyncError> {
        let author = request.author;
        let mut warnings = Vec::new();
        let mut deltas = self.deltas(request.public_topic).await?;
        let unseen = |deltas: &DeltaSet| {
            request
                .appended_deltas
                .iter()
                .filter(|d| !deltas.contains(d))
                .count()
        };

        if unseen(&deltas) > 0 {
            if let ReadAfterWrite::Poll { attempts, interval } = self.read_after_write {
                for attempt in 1..attempts.max(1) {
                    tokio::time::sleep(interval).await;
                    deltas = self.deltas(request.public_topic).await?;
                    if unseen(&deltas) == 0 {
                        debug!(agent = %author, attempt, "appended deltas became visible");
                        break;
                    }
                }
                for missing in request.appended_deltas.iter().filter(|d| !deltas.contains(d)) {
                    warn!(agent = %author, reason = %missing.reason, "appended delta never became visible");
                    warnings.push(SyncWarning::DeltaNotVisible {
                        agent: author.clone(),
                        reason: missing.reason.clone(),
                    });
                }
            }
        }
        let mut assumed_deltas = 0;
        for appended in request.appended_deltas {
            if deltas.insert(appended) {
                assumed_deltas += 1;
            }
        }

        let score = deltas.score_against(request.outcomes);

        if let Some(secondary) = &self.secondary {
            if let Err(e) = secondary.put_score(author, &score).await {
                warn!(agent = %author, error = %e, "secondary ledger score write failed");
                warnings.push(SyncWarning::SecondaryLedgerSyncFailed {
                    agent: author.clone(),
                    operation: "put_score",
                    reason: e.to_string(),
                });
            }
            for entry in &request.approved_content {
                if let Err(e) = secondary.put_content(author, entry).await {
                    warn!(agent = %author, item = %entry.item_id, error = %e, "secondary ledger content write failed");
                    warnings.push(SyncWarning::SecondaryLedgerSyncFailed {
                        agent: author.clone(),
                        operation: "put_content",
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            agent = %author,
            approvals = score.approvals,
            rejections = score.rejections,
            net = score.net_score,
            assumed_deltas,
            "reputation synced"
        );

        Ok(SyncReport {
            agent: author.clone(),
            score,
            deltas_counted: deltas.len(),
            assumed_deltas,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_ledger::{RawMessage, TopicLedger};
    use agora_messages::{encode, LedgerPayload};
    use agora_types::{Category, ConsensusTimestamp, ItemId, ItemStatus, Outcome, Timestamp};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Topic ledger whose newest message stays invisible for `lagging_reads` reads.
    #[derive(Default)]
    struct LaggingLedger {
        messages: Mutex<Vec<RawMessage>>,
        lagging_reads: AtomicUsize,
        unavailable: AtomicBool,
    }

    impl LaggingLedger {
        fn push(&self, delta: &ReputationDelta) {
            let mut messages = self.messages.lock().unwrap();
            let seq = messages.len() as u64 + 1;
            messages.push(RawMessage {
                topic_id: TopicId::new("0.0.50"),
                sequence_number: seq,
                consensus_timestamp: ConsensusTimestamp::new(seq, 0),
                contents: encode(&LedgerPayload::ReputationDelta(delta.clone())),
            });
        }
    }

    #[async_trait]
    impl TopicLedger for LaggingLedger {
        async fn fetch_page(
            &self,
            _topic: &TopicId,
            after: Option<u64>,
            limit: usize,
        ) -> Result<Vec<RawMessage>, LedgerError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("mirror down".into()));
            }
            let mut visible = self.messages.lock().unwrap().clone();
            if self.lagging_reads.load(Ordering::SeqCst) > 0 {
                self.lagging_reads.fetch_sub(1, Ordering::SeqCst);
                visible.pop();
            }
            Ok(visible
                .into_iter()
                .filter(|m| after.map_or(true, |a| m.sequence_number > a))
                .take(limit)
                .collect())
        }

        async fn append(&self, _topic: &TopicId, _contents: Vec<u8>) -> Result<u64, LedgerError> {
            unreachable!("the syncer never appends")
        }
    }

    #[derive(Default)]
    struct RecordingSecondary {
        scores: Mutex<Vec<ReputationScore>>,
        content: Mutex<Vec<ContentEntry>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ReputationLedger for RecordingSecondary {
        async fn record(&self, _agent: &AgentId) -> Result<Option<ReputationRecord>, SyncError> {
            Ok(None)
        }

        async fn put_score(&self, _agent: &AgentId, score: &ReputationScore) -> Result<(), SyncError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SyncError::Unreachable("down".into()));
            }
            self.scores.lock().unwrap().push(*score);
            Ok(())
        }

        async fn put_content(&self, _agent: &AgentId, entry: &ContentEntry) -> Result<(), SyncError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SyncError::Unreachable("down".into()));
            }
            self.content.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn delta(outcome: Outcome, item: &str) -> ReputationDelta {
        ReputationDelta::for_outcome(outcome, &ItemId::new(item), Timestamp::from_unix_secs(0))
    }

    fn entry(item: &str) -> ContentEntry {
        ContentEntry {
            item_id: ItemId::new(item),
            category: Category::Research,
            pointer: format!("ptr-{item}"),
            approved_at: Timestamp::from_unix_secs(0).to_iso(),
        }
    }

    fn syncer(
        ledger: &Arc<LaggingLedger>,
        secondary: &Arc<RecordingSecondary>,
        policy: ReadAfterWrite,
    ) -> ReputationSyncer {
        let reader = LedgerReader::new(ledger.clone());
        ReputationSyncer::new(reader, Some(secondary.clone() as Arc<dyn ReputationLedger>), policy)
    }

    static NO_OUTCOMES: std::sync::OnceLock<ItemOutcomes> = std::sync::OnceLock::new();

    fn request<'a>(
        author: &'a AgentId,
        topic: &'a TopicId,
        appended: &'a [ReputationDelta],
    ) -> SyncRequest<'a> {
        SyncRequest {
            author,
            public_topic: topic,
            appended_deltas: appended,
            outcomes: NO_OUTCOMES.get_or_init(ItemOutcomes::default),
            approved_content: Vec::new(),
        }
    }

    #[tokio::test]
    async fn optimistic_counts_a_lagging_delta_once() {
        let ledger = Arc::new(LaggingLedger::default());
        let secondary = Arc::new(RecordingSecondary::default());
        let appended = delta(Outcome::Approved, "x");
        ledger.push(&appended);
        ledger.lagging_reads.store(1, Ordering::SeqCst);

        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let report = syncer(&ledger, &secondary, ReadAfterWrite::Optimistic)
            .sync(request(&author, &topic, std::slice::from_ref(&appended)))
            .await
            .unwrap();
        assert_eq!(report.assumed_deltas, 1);
        assert_eq!(report.score.approvals, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(secondary.scores.lock().unwrap()[0].approvals, 1);
    }

    #[tokio::test]
    async fn optimistic_does_not_double_count_a_visible_delta() {
        let ledger = Arc::new(LaggingLedger::default());
        let secondary = Arc::new(RecordingSecondary::default());
        let appended = delta(Outcome::Approved, "x");
        ledger.push(&appended);

        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let report = syncer(&ledger, &secondary, ReadAfterWrite::Optimistic)
            .sync(request(&author, &topic, std::slice::from_ref(&appended)))
            .await
            .unwrap();
        assert_eq!(report.assumed_deltas, 0);
        assert_eq!(report.score.approvals, 1);
    }

    #[tokio::test]
    async fn poll_waits_for_visibility() {
        let ledger = Arc::new(LaggingLedger::default());
        let secondary = Arc::new(RecordingSecondary::default());
        ledger.push(&delta(Outcome::Rejected, "old"));
        let appended = delta(Outcome::Approved, "x");
        ledger.push(&appended);
        ledger.lagging_reads.store(2, Ordering::SeqCst);

        let policy = ReadAfterWrite::Poll {
            attempts: 5,
            interval: Duration::from_millis(1),
        };
        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let report = syncer(&ledger, &secondary, policy)
            .sync(request(&author, &topic, std::slice::from_ref(&appended)))
            .await
            .unwrap();
        assert_eq!(report.assumed_deltas, 0);
        assert!(report.warnings.is_empty());
        assert_eq!((report.score.approvals, report.score.rejections), (1, 1));
    }

    #[tokio::test]
    async fn poll_falls_back_to_union_with_warning() {
        let ledger = Arc::new(LaggingLedger::default());
        let secondary = Arc::new(RecordingSecondary::default());
        let appended = delta(Outcome::Approved, "x");

        let policy = ReadAfterWrite::Poll {
            attempts: 2,
            interval: Duration::from_millis(1),
        };
        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let report = syncer(&ledger, &secondary, policy)
            .sync(request(&author, &topic, std::slice::from_ref(&appended)))
            .await
            .unwrap();
        assert_eq!(report.assumed_deltas, 1);
        assert_eq!(report.score.approvals, 1);
        assert_eq!(report.warnings[0].code(), "delta_not_visible");
    }

    #[tokio::test]
    async fn secondary_failure_is_a_warning() {
        let ledger = Arc::new(LaggingLedger::default());
        let secondary = Arc::new(RecordingSecondary::default());
        secondary.fail.store(true, Ordering::SeqCst);
        ledger.push(&delta(Outcome::Approved, "x"));

        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let mut req = request(&author, &topic, &[]);
        req.approved_content = vec![entry("x")];
        let report = syncer(&ledger, &secondary, ReadAfterWrite::Optimistic)
            .sync(req)
            .await
            .unwrap();
        assert_eq!(report.score.approvals, 1);
        let codes: Vec<_> = report.warnings.iter().map(SyncWarning::code).collect();
        assert_eq!(codes, vec!["secondary_ledger_sync_failed"; 2]);
    }

    #[tokio::test]
    async fn content_is_published_only_when_given() {
        let ledger = Arc::new(LaggingLedger::default());
        let secondary = Arc::new(RecordingSecondary::default());
        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let syncer = syncer(&ledger, &secondary, ReadAfterWrite::Optimistic);

        syncer.sync(request(&author, &topic, &[])).await.unwrap();
        assert!(secondary.content.lock().unwrap().is_empty());

        let mut req = request(&author, &topic, &[]);
        req.approved_content = vec![entry("x")];
        syncer.sync(req).await.unwrap();
        assert_eq!(secondary.content.lock().unwrap()[0].pointer, "ptr-x");
    }

    #[tokio::test]
    async fn primary_read_failure_fails_the_sync() {
        let ledger = Arc::new(LaggingLedger::default());
        ledger.unavailable.store(true, Ordering::SeqCst);
        let secondary = Arc::new(RecordingSecondary::default());
        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let err = syncer(&ledger, &secondary, ReadAfterWrite::Optimistic)
            .sync(request(&author, &topic, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Ledger(LedgerError::Unavailable(_))));
        assert!(secondary.scores.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn racing_deltas_count_the_folded_outcome_only() {
        let ledger = Arc::new(LaggingLedger::default());
        let secondary = Arc::new(RecordingSecondary::default());
        ledger.push(&delta(Outcome::Approved, "x"));
        let appended = delta(Outcome::Rejected, "x");
        ledger.push(&appended);

        let outcomes: ItemOutcomes = [(ItemId::new("x"), ItemStatus::Approved)].into_iter().collect();
        let (author, topic) = (AgentId::new("alice"), TopicId::new("0.0.50"));
        let mut req = request(&author, &topic, std::slice::from_ref(&appended));
        req.outcomes = &outcomes;
        let report = syncer(&ledger, &secondary, ReadAfterWrite::Optimistic)
            .sync(req)
            .await
            .unwrap();
        assert_eq!(report.deltas_counted, 2);
        assert_eq!((report.score.approvals, report.score.rejections), (1, 0));
        assert_eq!(secondary.scores.lock().unwrap()[0].rejections, 0);
    }
}
