//! Ordered, decoding reads over a topic.

use crate::client::TopicLedger;
use crate::error::LedgerError;
use crate::event::{Event, RawMessage};
use agora_types::TopicId;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of messages requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default upper bound on pages read by [`LedgerReader::fetch_all`].
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// One decoded page of a topic.
#[derive(Clone, Debug, Default)]
pub struct EventPage {
    /// Decoded events in ascending sequence order.
    pub events: Vec<Event>,
    /// Highest raw sequence number seen, including messages that were dropped.
    /// Pass as `after` to read the next page.
    pub last_sequence: Option<u64>,
    /// Whether the ledger returned no messages at all. A short page is not the
    /// end of a topic: mirrors cap `limit` below what was asked for.
    pub exhausted: bool,
}

/// Reads topics from a [`TopicLedger`] and decodes them into [`Event`]s.
///
/// Malformed or unknown payloads are skipped, never surfaced: a corrupt entry
/// must not abort a fold. Read failures surface as
/// [`LedgerError::Unavailable`] and are never retried here.
#[derive(Clone)]
pub struct LedgerReader {
    ledger: Arc<dyn TopicLedger>,
    page_size: usize,
    max_pages: usize,
}

impl LedgerReader {
    pub fn new(ledger: Arc<dyn TopicLedger>) -> Self {
        Self::with_limits(ledger, DEFAULT_PAGE_SIZE, DEFAULT_MAX_PAGES)
    }

    pub fn with_limits(ledger: Arc<dyn TopicLedger>, page_size: usize, max_pages: usize) -> Self {
        Self {
            ledger,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The underlying ledger, for callers that also append.
    pub fn ledger(&self) -> &Arc<dyn TopicLedger> {
        &self.ledger
    }

    /// Fetch the first `limit` messages of a topic, decoded.
    pub async fn fetch_events(
        &self,
        topic: &TopicId,
        limit: usize,
    ) -> Result<Vec<Event>, LedgerError> {
        Ok(self.fetch_page(topic, None, limit).await?.events)
    }

    /// Fetch one page of messages after `after`, decoded.
    pub async fn fetch_page(
        &self,
        topic: &TopicId,
        after: Option<u64>,
        limit: usize,
    ) -> Result<EventPage, LedgerError> {
        let limit = limit.max(1);
        let raw = self.ledger.fetch_page(topic, after, limit).await?;
        let exhausted = raw.is_empty();
        Ok(decode_page(topic, after, raw, exhausted))
    }

    /// Fetch the whole topic, page by page, decoded.
    pub async fn fetch_all(&self, topic: &TopicId) -> Result<Vec<Event>, LedgerError> {
        let mut events = Vec::new();
        let mut after = None;
        for _ in 0..self.max_pages {
            let page = self.fetch_page(topic, after, self.page_size).await?;
            events.extend(page.events);
            if page.exhausted || page.last_sequence.is_none() || page.last_sequence == after {
                debug!(topic = %topic, count = events.len(), "topic read complete");
                return Ok(events);
            }
            after = page.last_sequence;
        }
        warn!(
            topic = %topic,
            max_pages = self.max_pages,
            "page limit reached before end of topic; fold covers a prefix only"
        );
        Ok(events)
    }
}

fn decode_page(
    topic: &TopicId,
    after: Option<u64>,
    mut raw: Vec<RawMessage>,
    exhausted: bool,
) -> EventPage {
    raw.sort_by_key(|m| m.sequence_number);

    let mut last = after;
    let mut events = Vec::with_capacity(raw.len());
    for message in raw {
        // Ledgers are totally ordered; a repeated or rewound number is a mirror glitch.
        if last.is_some_and(|l| message.sequence_number <= l) {
            debug!(
                topic = %topic,
                sequence = message.sequence_number,
                "skipping out-of-order message"
            );
            continue;
        }
        last = Some(message.sequence_number);
        match message.decode() {
            Ok(event) => events.push(event),
            Err(e) => debug!(
                topic = %topic,
                sequence = message.sequence_number,
                error = %e,
                "skipping undecodable message"
            ),
        }
    }

    EventPage {
        events,
        last_sequence: last,
        exhausted,
    }
}
