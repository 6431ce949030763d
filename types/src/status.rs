//! Vote directions and item lifecycle state.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The direction of a single vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Approve,
    Reject,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Approve => "approve",
            VoteDirection::Reject => "reject",
        }
    }

    /// The terminal outcome this direction drives an item towards.
    pub fn outcome(&self) -> Outcome {
        match self {
            VoteDirection::Approve => Outcome::Approved,
            VoteDirection::Reject => Outcome::Rejected,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(VoteDirection::Approve),
            "reject" => Ok(VoteDirection::Reject),
            other => Err(TypeError::UnknownVote(other.to_string())),
        }
    }
}

/// A terminal consensus outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Approved,
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Approved => "approved",
            Outcome::Rejected => "rejected",
        }
    }

    /// The vote direction whose tally produced this outcome.
    pub fn direction(&self) -> VoteDirection {
        match self {
            Outcome::Approved => VoteDirection::Approve,
            Outcome::Rejected => VoteDirection::Reject,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The derived lifecycle state of a knowledge item.
///
/// `Pending → {Approved, Rejected}`; both terminal states are final.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Pending)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            ItemStatus::Pending => None,
            ItemStatus::Approved => Some(Outcome::Approved),
            ItemStatus::Rejected => Some(Outcome::Rejected),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Approved => "approved",
            ItemStatus::Rejected => "rejected",
        }
    }
}

impl From<Outcome> for ItemStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Approved => ItemStatus::Approved,
            Outcome::Rejected => ItemStatus::Rejected,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
