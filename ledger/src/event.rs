//! Raw and decoded topic messages.

use agora_messages::{decode, DecodeError, LedgerPayload};
use agora_types::{ConsensusTimestamp, TopicId};

/// A message exactly as the ledger returns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    pub consensus_timestamp: ConsensusTimestamp,
    pub contents: Vec<u8>,
}

impl RawMessage {
    /// Decode the contents into a typed event. Nothing is partially decoded.
    pub fn decode(&self) -> Result<Event, DecodeError> {
        Ok(Event {
            topic_id: self.topic_id.clone(),
            sequence_number: self.sequence_number,
            consensus_timestamp: self.consensus_timestamp,
            payload: decode(&self.contents)?,
        })
    }
}

/// An immutable, ordered, fully-decoded record from a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    pub consensus_timestamp: ConsensusTimestamp,
    pub payload: LedgerPayload,
}
