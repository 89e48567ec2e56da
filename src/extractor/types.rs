//! Search event types extracted from a Takeout archive.
//!
//! An [`Event`] is a single search query with the instant it was issued.
//! Events are immutable once parsed; the aggregator only ever borrows them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// When the query was issued (microsecond resolution)
    pub timestamp: DateTime<Utc>,
    /// The query text, exactly as exported
    pub text: String,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}

/// Parse the decimal epoch-microsecond string used by Takeout.
///
/// Returns `None` if the string is not a plain run of ASCII digits or lies
/// outside the representable date range.
pub fn parse_timestamp_usec(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let micros: i64 = value.parse().ok()?;
    DateTime::from_timestamp_micros(micros)
}

/// An ordered collection of events.
///
/// Extraction yields events in discovery order. Call
/// [`EventSet::sort_by_timestamp`] before handing the events to the
/// aggregator; windowing assumes ascending order and does not check it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSet {
    events: Vec<Event>,
}

impl EventSet {
    /// Sort ascending by timestamp. Equal timestamps keep discovery order.
    pub fn sort_by_timestamp(&mut self) {
        self.events.sort_by_key(|e| e.timestamp);
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Earliest and latest timestamps, assuming the set is sorted.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}

impl From<Vec<Event>> for EventSet {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl Extend<Event> for EventSet {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}
