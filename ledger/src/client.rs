//! The topic ledger abstraction.
//!
//! Every ledger backend (HTTP mirror + submit gateway, in-memory for testing)
//! implements this trait. The rest of the engine depends only on the trait.

use crate::error::LedgerError;
use crate::event::RawMessage;
use agora_types::TopicId;
use async_trait::async_trait;

#[async_trait]
pub trait TopicLedger: Send + Sync {
    /// Read up to `limit` messages with sequence number strictly greater than
    /// `after` (or from the start), in ascending sequence order.
    async fn fetch_page(
        &self,
        topic: &TopicId,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RawMessage>, LedgerError>;

    /// Append a message and return the sequence number the ledger assigned.
    async fn append(&self, topic: &TopicId, contents: Vec<u8>) -> Result<u64, LedgerError>;
}
