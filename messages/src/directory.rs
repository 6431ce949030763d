//! Discovery-log registrations: which topics belong to which agent.

use agora_types::{AgentId, TopicId};
use serde::{Deserialize, Serialize};

/// `agent_registered`: binds an agent to its personal and public records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRegistered {
    pub agent: AgentId,
    /// Private activity record ("I voted" entries).
    pub personal_topic_id: TopicId,
    /// Public record holding reputation deltas.
    pub public_topic_id: TopicId,
    pub timestamp: String,
}
