//! Encoding and decoding of raw topic messages.
//!
//! Decoding is all-or-nothing: a message either becomes a fully-typed
//! [`LedgerPayload`] or a [`DecodeError`]. Callers skip errors instead of
//! aborting, so unknown or corrupt entries never poison a replay.

use crate::directory::AgentRegistered;
use crate::item::{FinalizedBody, ItemFinalized, ItemSubmitted, ItemVoted, VoteCast};
use crate::reputation::{ReputationDelta, MINT_OP, REP_LEDGER_PROTOCOL};
use agora_types::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload does not match the {kind} shape: {reason}")]
    Shape { kind: &'static str, reason: String },

    #[error("unknown ledger protocol: {0}")]
    UnknownProtocol(String),

    #[error("unsupported rep-ledger operation: {0}")]
    UnsupportedOp(String),

    #[error("invalid rep-ledger amount: {0}")]
    InvalidAmount(String),

    #[error("payload carries neither an action nor a protocol marker")]
    Unrecognized,
}

/// Every payload the engine reads or writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerPayload {
    ItemSubmitted(ItemSubmitted),
    ItemVoted(ItemVoted),
    ItemFinalized(ItemFinalized),
    ReputationDelta(ReputationDelta),
    VoteCast(VoteCast),
    AgentRegistered(AgentRegistered),
}

impl LedgerPayload {
    /// Short label for logs and activity listings.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerPayload::ItemSubmitted(_) => "item_submitted",
            LedgerPayload::ItemVoted(_) => "item_voted",
            LedgerPayload::ItemFinalized(f) => match f.outcome {
                Outcome::Approved => "item_approved",
                Outcome::Rejected => "item_rejected",
            },
            LedgerPayload::ReputationDelta(_) => "rep_delta",
            LedgerPayload::VoteCast(_) => "vote_cast",
            LedgerPayload::AgentRegistered(_) => "agent_registered",
        }
    }
}

/// Wire form of every `action`-tagged payload. The tag is serialized first.
#[derive(Serialize, Deserialize)]
#[serde(tag = "action")]
enum ActionEnvelope {
    #[serde(rename = "item_submitted")]
    ItemSubmitted(ItemSubmitted),
    #[serde(rename = "item_voted")]
    ItemVoted(ItemVoted),
    #[serde(rename = "item_approved")]
    ItemApproved(FinalizedBody),
    #[serde(rename = "item_rejected")]
    ItemRejected(FinalizedBody),
    #[serde(rename = "vote_cast")]
    VoteCast(VoteCast),
    #[serde(rename = "agent_registered")]
    AgentRegistered(AgentRegistered),
}

impl From<ActionEnvelope> for LedgerPayload {
    fn from(envelope: ActionEnvelope) -> Self {
        match envelope {
            ActionEnvelope::ItemSubmitted(p) => LedgerPayload::ItemSubmitted(p),
            ActionEnvelope::ItemVoted(p) => LedgerPayload::ItemVoted(p),
            ActionEnvelope::ItemApproved(body) => LedgerPayload::ItemFinalized(ItemFinalized {
                outcome: Outcome::Approved,
                body,
            }),
            ActionEnvelope::ItemRejected(body) => LedgerPayload::ItemFinalized(ItemFinalized {
                outcome: Outcome::Rejected,
                body,
            }),
            ActionEnvelope::VoteCast(p) => LedgerPayload::VoteCast(p),
            ActionEnvelope::AgentRegistered(p) => LedgerPayload::AgentRegistered(p),
        }
    }
}

/// Serialize a payload to the bytes appended to a topic.
pub fn encode(payload: &LedgerPayload) -> Vec<u8> {
    let result = match payload.clone() {
        LedgerPayload::ReputationDelta(delta) => serde_json::to_vec(&delta),
        LedgerPayload::ItemSubmitted(p) => serde_json::to_vec(&ActionEnvelope::ItemSubmitted(p)),
        LedgerPayload::ItemVoted(p) => serde_json::to_vec(&ActionEnvelope::ItemVoted(p)),
        LedgerPayload::ItemFinalized(f) => match f.outcome {
            Outcome::Approved => serde_json::to_vec(&ActionEnvelope::ItemApproved(f.body)),
            Outcome::Rejected => serde_json::to_vec(&ActionEnvelope::ItemRejected(f.body)),
        },
        LedgerPayload::VoteCast(p) => serde_json::to_vec(&ActionEnvelope::VoteCast(p)),
        LedgerPayload::AgentRegistered(p) => {
            serde_json::to_vec(&ActionEnvelope::AgentRegistered(p))
        }
    };
    // Plain structs of strings and enums: serialization cannot fail.
    result.unwrap_or_default()
}

/// Decode raw topic bytes into a typed payload.
pub fn decode(bytes: &[u8]) -> Result<LedgerPayload, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Json(e.to_string()))?;
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    if obj.contains_key("action") {
        let envelope: ActionEnvelope =
            serde_json::from_value(value).map_err(|e| DecodeError::Shape {
                kind: "action",
                reason: e.to_string(),
            })?;
        return Ok(envelope.into());
    }

    match obj.get("p").and_then(Value::as_str) {
        Some(REP_LEDGER_PROTOCOL) => {
            let delta: ReputationDelta =
                serde_json::from_value(value).map_err(|e| DecodeError::Shape {
                    kind: "rep-ledger",
                    reason: e.to_string(),
                })?;
            if delta.op != MINT_OP {
                return Err(DecodeError::UnsupportedOp(delta.op));
            }
            if delta.amount().is_none() {
                return Err(DecodeError::InvalidAmount(delta.amt));
            }
            Ok(LedgerPayload::ReputationDelta(delta))
        }
        Some(other) => Err(DecodeError::UnknownProtocol(other.to_string())),
        None => Err(DecodeError::Unrecognized),
    }
}
