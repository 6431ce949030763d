//! Agent directory and identity resolution.
//!
//! Two lookups sit in front of every vote:
//! - **Identity**: a caller's credential resolves to a stable [`AgentId`]
//!   through an [`IdentityResolver`] (static token table or HTTP service).
//! - **Topics**: an agent resolves to its personal and public records through a
//!   [`TopicDirectory`], materialised from the discovery topic's
//!   `agent_registered` events rather than scanned per lookup.
//!
//! [`AgentId`]: agora_types::AgentId

pub mod client;
pub mod error;
pub mod identity;
pub mod registry;

pub use client::HttpIdentityResolver;
pub use error::DirectoryError;
pub use identity::{IdentityResolver, StaticIdentityResolver};
pub use registry::{AgentTopics, MaterializedDirectory, TopicDirectory};
