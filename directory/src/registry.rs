//! Topic directory: which personal and public records belong to an agent.

use agora_ledger::{Event, LedgerError, LedgerReader};
use agora_messages::LedgerPayload;
use agora_types::{AgentId, TopicId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// The two per-agent records on the primary ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTopics {
    /// Private activity record ("I voted" entries).
    pub personal: TopicId,
    /// Public record holding reputation deltas.
    pub public: TopicId,
}

/// Lookup from agent identity to its records.
pub trait TopicDirectory: Send + Sync {
    fn resolve(&self, agent: &AgentId) -> Option<AgentTopics>;
}

/// A hash-map view over the discovery log.
#[derive(Clone, Debug, Default)]
pub struct MaterializedDirectory {
    entries: HashMap<AgentId, AgentTopics>,
}

impl MaterializedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the view from discovery events. The first registration per agent
    /// wins; later ones cannot redirect an agent's records.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut directory = Self::new();
        for event in events {
            if let LedgerPayload::AgentRegistered(reg) = &event.payload {
                if directory.entries.contains_key(&reg.agent) {
                    debug!(agent = %reg.agent, "ignoring repeated registration");
                    continue;
                }
                directory.entries.insert(
                    reg.agent.clone(),
                    AgentTopics {
                        personal: reg.personal_topic_id.clone(),
                        public: reg.public_topic_id.clone(),
                    },
                );
            }
        }
        directory
    }

    /// Replay the discovery topic, then apply static overrides on top.
    pub async fn load(
        reader: &LedgerReader,
        discovery_topic: Option<&TopicId>,
        overrides: &HashMap<AgentId, AgentTopics>,
    ) -> Result<Self, LedgerError> {
        let mut directory = match discovery_topic {
            Some(topic) => Self::from_events(&reader.fetch_all(topic).await?),
            None => Self::new(),
        };
        for (agent, topics) in overrides {
            directory.register(agent.clone(), topics.clone());
        }
        Ok(directory)
    }

    /// Insert or replace an entry.
    pub fn register(&mut self, agent: AgentId, topics: AgentTopics) {
        self.entries.insert(agent, topics);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TopicDirectory for MaterializedDirectory {
    fn resolve(&self, agent: &AgentId) -> Option<AgentTopics> {
        self.entries.get(agent).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_messages::AgentRegistered;
    use agora_types::ConsensusTimestamp;

    fn registration(seq: u64, agent: &str, personal: &str, public: &str) -> Event {
        Event {
            topic_id: TopicId::new("0.0.1"),
            sequence_number: seq,
            consensus_timestamp: ConsensusTimestamp::new(seq, 0),
            payload: LedgerPayload::AgentRegistered(AgentRegistered {
                agent: AgentId::new(agent),
                personal_topic_id: TopicId::new(personal),
                public_topic_id: TopicId::new(public),
                timestamp: String::new(),
            }),
        }
    }

    #[test]
    fn first_registration_wins() {
        let events = vec![
            registration(1, "alice", "0.0.10", "0.0.11"),
            registration(2, "bob", "0.0.20", "0.0.21"),
            registration(3, "alice", "0.0.99", "0.0.98"),
        ];
        let dir = MaterializedDirectory::from_events(&events);
        assert_eq!(dir.len(), 2);
        let alice = dir.resolve(&AgentId::new("alice")).unwrap();
        assert_eq!(alice.public, TopicId::new("0.0.11"));
        assert!(dir.resolve(&AgentId::new("carol")).is_none());
    }

    #[test]
    fn register_overrides_entry() {
        let mut dir = MaterializedDirectory::from_events(&[registration(1, "alice", "a", "b")]);
        dir.register(
            AgentId::new("alice"),
            AgentTopics {
                personal: TopicId::new("p"),
                public: TopicId::new("q"),
            },
        );
        assert_eq!(dir.resolve(&AgentId::new("alice")).unwrap().personal, TopicId::new("p"));
    }
}
