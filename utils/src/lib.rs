//! Shared utilities for the Agora knowledge engine.

pub mod logging;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
