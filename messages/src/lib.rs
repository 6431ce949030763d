//! Ledger payload types for the Agora knowledge marketplace.
//!
//! Every message appended to a topic is a small JSON document. The field names
//! and tag values here are a public wire contract: third-party observers read
//! the raw topics without this crate, so shapes must stay byte-compatible.
//!
//! Item topics (one per category) carry `item_submitted`, `item_voted` and
//! `item_approved` / `item_rejected`. An agent's public record carries
//! `rep-ledger` mint operations; its personal record carries `vote_cast`.
//! The discovery topic carries `agent_registered`.

pub mod codec;
pub mod directory;
pub mod item;
pub mod reputation;

pub use codec::{decode, encode, DecodeError, LedgerPayload};
pub use directory::AgentRegistered;
pub use item::{ItemFinalized, ItemSubmitted, ItemVoted, VoteCast};
pub use reputation::{DeltaTick, ReputationDelta, REP_LEDGER_PROTOCOL};
