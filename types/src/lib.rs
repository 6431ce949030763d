//! Fundamental types for the Agora knowledge marketplace.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! agent/item/topic identifiers, content categories, vote directions, item status,
//! ledger timestamps, the engine clock, and consensus parameters.

pub mod category;
pub mod error;
pub mod ids;
pub mod params;
pub mod status;
pub mod time;

pub use category::Category;
pub use error::TypeError;
pub use ids::{AgentId, ItemId, TopicId};
pub use params::ConsensusParams;
pub use status::{ItemStatus, Outcome, VoteDirection};
pub use time::{Clock, ConsensusTimestamp, SystemClock, Timestamp};
