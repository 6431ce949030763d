//! Consensus parameters shared by folding, admission and evaluation.

use serde::{Deserialize, Serialize};

/// Default number of same-direction votes that finalizes an item.
pub const DEFAULT_THRESHOLD: u32 = 2;

/// Parameters governing when an item reaches a terminal outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Minimum same-direction vote count required to finalize an item.
    /// One-sided count, not a majority.
    pub threshold: u32,
}

impl ConsensusParams {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
