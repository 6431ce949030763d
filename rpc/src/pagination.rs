//! Cursor-based pagination for the activity endpoint.
//!
//! A cursor is the URL-safe base64 of the last sequence number a client has
//! seen; the next page starts strictly after it.

use crate::error::RpcError;
use agora_node::MAX_ACTIVITY_PAGE;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Default page size when `count` is not specified.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Query parameters accepted by paged endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    /// Opaque cursor from a previous response.
    pub cursor: Option<String>,
    pub count: Option<usize>,
}

impl PaginationParams {
    /// Effective page size, clamped to `[1, MAX_ACTIVITY_PAGE]`.
    pub fn effective_count(&self) -> usize {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_ACTIVITY_PAGE)
    }

    /// Sequence number to read after, or `None` for the first page.
    pub fn after(&self) -> Result<Option<u64>, RpcError> {
        match self.cursor.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(cursor) => decode_cursor(cursor)
                .map(Some)
                .ok_or_else(|| RpcError::InvalidRequest(format!("malformed cursor {cursor:?}"))),
        }
    }
}

pub fn encode_cursor(sequence_number: u64) -> String {
    URL_SAFE_NO_PAD.encode(sequence_number.to_string())
}

pub fn decode_cursor(cursor: &str) -> Option<u64> {
    let bytes = URL_SAFE_NO_PAD.decode(cursor).ok()?;
    std::str::from_utf8(&bytes).ok()?.parse().ok()
}
