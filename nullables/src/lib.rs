//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the engine (the topic ledger, the secondary
//! reputation ledger, the clock) sits behind a trait. This crate provides
//! in-memory implementations that:
//! - return deterministic values
//! - can be steered programmatically (failure injection, read lag)
//! - never touch the network
//!
//! The daemon's `--in-memory` mode runs on these as well.

pub mod clock;
pub mod ledger;
pub mod secondary;

pub use clock::NullClock;
pub use ledger::InMemoryLedger;
pub use secondary::NullReputationLedger;
