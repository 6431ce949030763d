//! Nullable secondary ledger: reputation records held in memory.

use agora_reputation::{ContentEntry, ReputationLedger, ReputationRecord, ReputationScore, SyncError};
use agora_types::AgentId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct NullReputationLedger {
    records: Mutex<HashMap<AgentId, ReputationRecord>>,
    unavailable: AtomicBool,
    writes: AtomicU64,
}

impl NullReputationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`SyncError::Unreachable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current record for assertions.
    pub fn get(&self, agent: &AgentId) -> Option<ReputationRecord> {
        self.records.lock().unwrap().get(agent).cloned()
    }

    /// Successful writes so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SyncError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SyncError::Unreachable("secondary ledger offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReputationLedger for NullReputationLedger {
    async fn record(&self, agent: &AgentId) -> Result<Option<ReputationRecord>, SyncError> {
        self.check()?;
        Ok(self.get(agent))
    }

    async fn put_score(&self, agent: &AgentId, score: &ReputationScore) -> Result<(), SyncError> {
        self.check()?;
        self.records
            .lock()
            .unwrap()
            .entry(agent.clone())
            .or_default()
            .score = *score;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put_content(&self, agent: &AgentId, entry: &ContentEntry) -> Result<(), SyncError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let content = &mut records.entry(agent.clone()).or_default().content;
        match content.iter_mut().find(|e| e.item_id == entry.item_id) {
            Some(existing) => *existing = entry.clone(),
            None => content.push(entry.clone()),
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
