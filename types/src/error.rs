//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown vote direction: {0}")]
    UnknownVote(String),

    #[error("invalid consensus timestamp: {0}")]
    InvalidConsensusTimestamp(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("identifier must not be empty")]
    EmptyIdentifier,
}
