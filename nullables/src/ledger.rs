//! Nullable topic ledger: a thread-safe in-memory set of append-only topics.

use agora_ledger::{LedgerError, RawMessage, TopicLedger};
use agora_messages::{decode, encode, LedgerPayload};
use agora_types::{ConsensusTimestamp, TopicId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Reads of a topic that has never been written return an empty page, the
/// way a freshly created topic does on a real mirror.
pub struct InMemoryLedger {
    topics: Mutex<HashMap<TopicId, Vec<RawMessage>>>,
    /// Source of consensus timestamps; one tick per append.
    ticks: AtomicU64,
    next_topic: AtomicU64,
    reads_unavailable: AtomicBool,
    /// Topics whose appends always fail.
    append_failures: Mutex<HashSet<TopicId>>,
    /// Topics whose next N appends fail transiently.
    transient_append_failures: Mutex<HashMap<TopicId, u32>>,
    /// Number of newest messages hidden from reads, per topic.
    read_lag: Mutex<HashMap<TopicId, usize>>,
    append_attempts: AtomicU64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            ticks: AtomicU64::new(1_700_000_000),
            next_topic: AtomicU64::new(1000),
            reads_unavailable: AtomicBool::new(false),
            append_failures: Mutex::new(HashSet::new()),
            transient_append_failures: Mutex::new(HashMap::new()),
            read_lag: Mutex::new(HashMap::new()),
            append_attempts: AtomicU64::new(0),
        }
    }

    /// Allocate a fresh, empty topic id (`0.0.<n>`).
    pub fn create_topic(&self) -> TopicId {
        let n = self.next_topic.fetch_add(1, Ordering::SeqCst);
        let topic = TopicId::new(format!("0.0.{n}"));
        self.topics.lock().unwrap().entry(topic.clone()).or_default();
        topic
    }

    /// Append raw bytes, bypassing failure injection. Returns the sequence number.
    pub fn append_raw(&self, topic: &TopicId, contents: Vec<u8>) -> u64 {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        let mut topics = self.topics.lock().unwrap();
        let messages = topics.entry(topic.clone()).or_default();
        let sequence_number = messages.len() as u64 + 1;
        messages.push(RawMessage {
            topic_id: topic.clone(),
            sequence_number,
            consensus_timestamp: ConsensusTimestamp::new(tick, 0),
            contents,
        });
        sequence_number
    }

    /// Append an encoded payload, bypassing failure injection.
    pub fn append_payload(&self, topic: &TopicId, payload: &LedgerPayload) -> u64 {
        self.append_raw(topic, encode(payload))
    }

    /// Every decodable payload on a topic, lag ignored.
    pub fn payloads(&self, topic: &TopicId) -> Vec<LedgerPayload> {
        self.topics
            .lock()
            .unwrap()
            .get(topic)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|m| decode(&m.contents).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn message_count(&self, topic: &TopicId) -> usize {
        self.topics.lock().unwrap().get(topic).map_or(0, Vec::len)
    }

    /// Number of `append` calls received through [`TopicLedger`], failed or not.
    pub fn append_attempts(&self) -> u64 {
        self.append_attempts.load(Ordering::SeqCst)
    }

    /// Make every read fail with [`LedgerError::Unavailable`].
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.reads_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every append to `topic` fail until cleared.
    pub fn fail_appends_to(&self, topic: &TopicId) {
        self.append_failures.lock().unwrap().insert(topic.clone());
    }

    pub fn clear_append_failures(&self) {
        self.append_failures.lock().unwrap().clear();
        self.transient_append_failures.lock().unwrap().clear();
    }

    /// Make the next `count` appends to `topic` fail transiently.
    pub fn fail_next_appends(&self, topic: &TopicId, count: u32) {
        self.transient_append_failures
            .lock()
            .unwrap()
            .insert(topic.clone(), count);
    }

    /// Hide the newest `hidden` messages of `topic` from reads, simulating a
    /// mirror that lags behind consensus.
    pub fn set_read_lag(&self, topic: &TopicId, hidden: usize) {
        self.read_lag.lock().unwrap().insert(topic.clone(), hidden);
    }

    fn take_transient_failure(&self, topic: &TopicId) -> bool {
        let mut failures = self.transient_append_failures.lock().unwrap();
        match failures.get_mut(topic) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicLedger for InMemoryLedger {
    async fn fetch_page(
        &self,
        topic: &TopicId,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RawMessage>, LedgerError> {
        if self.reads_unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable(format!("read of {topic} failed")));
        }
        let hidden = self.read_lag.lock().unwrap().get(topic).copied().unwrap_or(0);
        let topics = self.topics.lock().unwrap();
        let Some(messages) = topics.get(topic) else {
            return Ok(Vec::new());
        };
        let visible = messages.len().saturating_sub(hidden);
        Ok(messages[..visible]
            .iter()
            .filter(|m| after.map_or(true, |a| m.sequence_number > a))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn append(&self, topic: &TopicId, contents: Vec<u8>) -> Result<u64, LedgerError> {
        self.append_attempts.fetch_add(1, Ordering::SeqCst);
        if self.append_failures.lock().unwrap().contains(topic) {
            return Err(LedgerError::AppendRejected {
                topic: topic.clone(),
                reason: "append failure injected".into(),
            });
        }
        if self.take_transient_failure(topic) {
            return Err(LedgerError::Unavailable(format!("append to {topic} timed out")));
        }
        Ok(self.append_raw(topic, contents))
    }
}
