//! Knowledge consensus: from an ordered event log to voting outcomes.
//!
//! Pure, synchronous logic with no I/O:
//! 1. **Fold**: replay a category topic into per-item aggregates
//!    (submission, counted votes, finalization).
//! 2. **Admit**: decide whether a proposed vote may be appended.
//! 3. **Evaluate**: tally the admitted vote and detect a threshold crossing.
//!
//! An item moves `Pending → {Approved, Rejected}` exactly once. Thresholds are
//! one-sided counts: `T` approvals approve, `T` rejections reject.

pub mod admission;
pub mod error;
pub mod evaluator;
pub mod fold;

pub use admission::{CandidateVote, VoteAdmission};
pub use error::AdmissionError;
pub use evaluator::{ConsensusEvaluator, Evaluation, Tally};
pub use fold::{CastVote, EventFolder, Finalization, FoldedLog, ItemSnapshot, Submission};
