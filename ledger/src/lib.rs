//! Access to the primary ledger: append-only, totally-ordered topics.
//!
//! The [`TopicLedger`] trait is the only seam to the outside world. On top of
//! it, [`LedgerReader`] pages through a topic in ascending sequence order and
//! decodes each message into a typed [`Event`], silently dropping anything it
//! cannot fully decode.

pub mod client;
pub mod error;
pub mod event;
pub mod mirror;
pub mod reader;
pub mod retry;

pub use client::TopicLedger;
pub use error::LedgerError;
pub use event::{Event, RawMessage};
pub use mirror::{MirrorClient, MirrorConfig};
pub use reader::{EventPage, LedgerReader, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
pub use retry::RetryPolicy;
