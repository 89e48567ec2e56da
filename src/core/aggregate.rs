//! Windowed aggregation of search events into token histograms.
//!
//! The aggregator walks a sorted event slice once. In windowed mode an
//! explicit [`WindowCursor`] marks the first event not yet assigned to a
//! window, so no event is scanned twice and the slice is never mutated.
//!
//! Window generation stops at a caller-supplied `now`; trailing windows with
//! no events are still emitted, with an empty histogram.

use crate::config::{AggregationConfig, Tokenization};
use crate::core::tokenize::Histogram;
use crate::core::windowing::{isoformat, Window, WindowUnit};
use crate::extractor::Event;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Aggregation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// Windowed mode needs at least one event to anchor the first window.
    #[error("insufficient data: no events to anchor the first window")]
    InsufficientData,

    #[error("date out of range while building {0:?} windows")]
    OutOfRange(WindowUnit),
}

/// One point of the time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesEntry {
    /// Window start, or the event's own timestamp in raw mode
    pub start: DateTime<Tz>,
    pub histogram: Histogram,
    /// Number of events that contributed to the histogram
    pub event_count: usize,
}

impl TimeSeriesEntry {
    /// ISO-8601 key used in the output document.
    pub fn key(&self) -> String {
        isoformat(&self.start)
    }
}

/// Chronologically ordered histograms.
///
/// Serializes as a JSON object whose keys appear in chronological order.
/// Raw-mode entries that share a timestamp are merged under one key when
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    entries: Vec<TimeSeriesEntry>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TimeSeriesEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TimeSeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeSeriesEntry> {
        self.entries.iter()
    }

    /// Keys in output order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(TimeSeriesEntry::key).collect()
    }

    /// Sum of all histogram counts.
    pub fn total_tokens(&self) -> u64 {
        self.entries.iter().map(|e| e.histogram.total()).sum()
    }

    /// Number of events counted across all entries.
    pub fn total_events(&self) -> usize {
        self.entries.iter().map(|e| e.event_count).sum()
    }

    /// Number of entries whose histogram is empty.
    pub fn empty_windows(&self) -> usize {
        self.entries.iter().filter(|e| e.histogram.is_empty()).count()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a TimeSeriesEntry;
    type IntoIter = std::slice::Iter<'a, TimeSeriesEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for TimeSeries {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let groups: Vec<&[TimeSeriesEntry]> = self
            .entries
            .chunk_by(|a, b| a.start == b.start)
            .collect();

        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for group in groups {
            let key = group[0].key();
            if let [single] = group {
                map.serialize_entry(&key, &single.histogram)?;
            } else {
                let mut merged = Histogram::new();
                for entry in group {
                    merged.merge(&entry.histogram);
                }
                map.serialize_entry(&key, &merged)?;
            }
        }
        map.end()
    }
}

/// Position into a sorted event slice.
///
/// Everything before [`WindowCursor::position`] has been assigned to a
/// window; everything from it onward is still pending.
#[derive(Debug, Clone)]
pub struct WindowCursor<'a> {
    events: &'a [Event],
    position: usize,
}

impl<'a> WindowCursor<'a> {
    pub fn new(events: &'a [Event]) -> Self {
        Self {
            events,
            position: 0,
        }
    }

    /// Index of the next unassigned event.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of events not yet assigned.
    pub fn remaining(&self) -> usize {
        self.events.len() - self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.events.len()
    }

    /// Assign pending events that fall before `window.end` to `window`.
    ///
    /// Returns the window's histogram and the number of events consumed.
    /// Relies on ascending order: consumption stops at the first event at or
    /// after the window end.
    pub fn consume(&mut self, window: &Window, mode: Tokenization) -> (Histogram, usize) {
        let end = window.end.with_timezone(&Utc);
        let begin = self.position;
        let mut histogram = Histogram::new();

        while let Some(event) = self.events.get(self.position) {
            if event.timestamp >= end {
                break;
            }
            histogram.add_text(&event.text, mode);
            self.position += 1;
        }

        (histogram, self.position - begin)
    }
}

/// Aggregate sorted events into a time series.
///
/// `now` bounds window generation: windows are produced while their start is
/// before `now`. Raw mode ignores it.
pub fn aggregate(
    events: &[Event],
    config: &AggregationConfig,
    now: DateTime<Utc>,
) -> Result<TimeSeries, AggregateError> {
    match WindowUnit::from_granularity(config.granularity) {
        None => Ok(aggregate_raw(events, config)),
        Some(unit) => aggregate_windowed(events, config, unit, now),
    }
}

fn aggregate_raw(events: &[Event], config: &AggregationConfig) -> TimeSeries {
    let mut series = TimeSeries::new();
    for event in events {
        let mut histogram = Histogram::new();
        histogram.add_text(&event.text, config.tokenization);
        series.push(TimeSeriesEntry {
            start: event.timestamp.with_timezone(&config.timezone),
            histogram,
            event_count: 1,
        });
    }
    series
}

fn aggregate_windowed(
    events: &[Event],
    config: &AggregationConfig,
    unit: WindowUnit,
    now: DateTime<Utc>,
) -> Result<TimeSeries, AggregateError> {
    let first = events.first().ok_or(AggregateError::InsufficientData)?;
    let anchor = first.timestamp.with_timezone(&config.timezone);
    let mut window = Window::containing(unit, anchor).ok_or(AggregateError::OutOfRange(unit))?;

    let mut cursor = WindowCursor::new(events);
    let mut series = TimeSeries::new();

    while window.start.with_timezone(&Utc) < now {
        let (histogram, event_count) = cursor.consume(&window, config.tokenization);
        series.push(TimeSeriesEntry {
            start: window.start,
            histogram,
            event_count,
        });

        if !window.ends_before(now) {
            break;
        }
        window = window.following().ok_or(AggregateError::OutOfRange(unit))?;
    }

    if !cursor.is_exhausted() {
        tracing::warn!(
            uncounted = cursor.remaining(),
            "events at or after the current time were not counted"
        );
    }
    tracing::debug!(
        granularity = %config.granularity,
        windows = series.len(),
        empty = series.empty_windows(),
        "aggregated events"
    );

    Ok(series)
}

/// Runs aggregations against the wall clock, or a pinned instant.
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AggregationConfig,
    now: Option<DateTime<Utc>>,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config, now: None }
    }

    /// Pin the instant that bounds window generation.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn run(&self, events: &[Event]) -> Result<TimeSeries, AggregateError> {
        let now = self.now.unwrap_or_else(Utc::now);
        aggregate(events, &self.config, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Granularity;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn config(granularity: Granularity, tokenization: Tokenization) -> AggregationConfig {
        AggregationConfig::new(granularity, tokenization)
    }

    #[test]
    fn test_hourly_scenario() {
        let t0 = DateTime::from_timestamp_micros(1_000_000).unwrap();
        let events = vec![
            Event::new(t0, "cats"),
            Event::new(t0 + Duration::minutes(90), "cats dogs"),
        ];

        let series = aggregate(
            &events,
            &config(Granularity::Hour, Tokenization::Words),
            at(1970, 1, 1, 2, 0, 0),
        )
        .unwrap();

        assert_eq!(
            series.keys(),
            vec!["1970-01-01T00:00:00+00:00", "1970-01-01T01:00:00+00:00"]
        );
        let first = &series.entries()[0].histogram;
        assert_eq!(first.get("cats"), 1);
        assert_eq!(first.len(), 1);
        let second = &series.entries()[1].histogram;
        assert_eq!(second.get("cats"), 1);
        assert_eq!(second.get("dogs"), 1);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_boundary_event_belongs_to_later_window() {
        let events = vec![
            Event::new(at(2020, 6, 1, 0, 59, 59), "before"),
            Event::new(at(2020, 6, 1, 1, 0, 0), "on"),
            Event::new(at(2020, 6, 1, 2, 0, 0), "next"),
        ];

        let series = aggregate(
            &events,
            &config(Granularity::Hour, Tokenization::Full),
            at(2020, 6, 1, 2, 30, 0),
        )
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.entries()[0].histogram.get("before"), 1);
        assert_eq!(series.entries()[0].event_count, 1);
        assert_eq!(series.entries()[1].histogram.get("on"), 1);
        assert_eq!(series.entries()[1].event_count, 1);
        assert_eq!(series.entries()[2].histogram.get("next"), 1);
        assert_eq!(series.total_events(), 3);
    }

    #[test]
    fn test_gap_windows_are_emitted_empty() {
        let events = vec![Event::new(at(2021, 1, 1, 10, 0, 0), "lonely query")];

        let series = aggregate(
            &events,
            &config(Granularity::Day, Tokenization::Words),
            at(2021, 1, 10, 12, 0, 0),
        )
        .unwrap();

        assert_eq!(series.len(), 10);
        assert_eq!(series.entries()[0].histogram.total(), 2);
        assert_eq!(series.empty_windows(), 9);
        for pair in series.entries().windows(2) {
            assert_eq!(pair[1].start - pair[0].start, Duration::days(1));
        }
        assert_eq!(series.keys().last().unwrap(), "2021-01-10T00:00:00+00:00");
    }

    #[test]
    fn test_window_starting_exactly_at_now_is_excluded() {
        let events = vec![Event::new(at(2021, 1, 1, 10, 0, 0), "q")];
        let series = aggregate(
            &events,
            &config(Granularity::Day, Tokenization::Words),
            at(2021, 1, 3, 0, 0, 0),
        )
        .unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_events_after_now_are_not_counted() {
        let events = vec![
            Event::new(at(2021, 1, 1, 10, 0, 0), "past"),
            Event::new(at(2021, 1, 5, 10, 0, 0), "future"),
        ];
        let series = aggregate(
            &events,
            &config(Granularity::Day, Tokenization::Words),
            at(2021, 1, 2, 12, 0, 0),
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.total_events(), 1);
        assert_eq!(series.entries()[1].histogram.get("future"), 0);
    }

    #[test]
    fn test_first_event_in_future_yields_no_windows() {
        let events = vec![Event::new(at(2030, 1, 1, 0, 0, 0), "q")];
        let series = aggregate(
            &events,
            &config(Granularity::Month, Tokenization::Words),
            at(2021, 1, 1, 0, 0, 0),
        )
        .unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_month_and_year_windows() {
        let events = vec![
            Event::new(at(2019, 11, 20, 8, 0, 0), "a"),
            Event::new(at(2020, 2, 29, 23, 59, 59), "b"),
            Event::new(at(2020, 3, 1, 0, 0, 0), "c"),
        ];

        let monthly = aggregate(
            &events,
            &config(Granularity::Month, Tokenization::Words),
            at(2020, 3, 15, 0, 0, 0),
        )
        .unwrap();
        assert_eq!(
            monthly.keys(),
            vec![
                "2019-11-01T00:00:00+00:00",
                "2019-12-01T00:00:00+00:00",
                "2020-01-01T00:00:00+00:00",
                "2020-02-01T00:00:00+00:00",
                "2020-03-01T00:00:00+00:00",
            ]
        );
        assert_eq!(monthly.entries()[3].histogram.get("b"), 1);
        assert_eq!(monthly.entries()[4].histogram.get("c"), 1);

        let yearly = aggregate(
            &events,
            &config(Granularity::Year, Tokenization::Words),
            at(2020, 3, 15, 0, 0, 0),
        )
        .unwrap();
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly.entries()[0].event_count, 1);
        assert_eq!(yearly.entries()[1].event_count, 2);
    }

    #[test]
    fn test_weekly_windows_start_on_monday() {
        // 2021-03-17 is a Wednesday, 2021-03-22 a Monday
        let events = vec![
            Event::new(at(2021, 3, 17, 9, 0, 0), "wed"),
            Event::new(at(2021, 3, 22, 0, 0, 0), "mon"),
        ];
        let series = aggregate(
            &events,
            &config(Granularity::Week, Tokenization::Full),
            at(2021, 3, 23, 0, 0, 0),
        )
        .unwrap();
        assert_eq!(
            series.keys(),
            vec!["2021-03-15T00:00:00+00:00", "2021-03-22T00:00:00+00:00"]
        );
        assert_eq!(series.entries()[1].histogram.get("mon"), 1);
    }

    #[test]
    fn test_cursor_tracks_consumption() {
        let events = vec![
            Event::new(at(2020, 1, 1, 0, 10, 0), "a"),
            Event::new(at(2020, 1, 1, 0, 20, 0), "b"),
            Event::new(at(2020, 1, 1, 2, 5, 0), "c"),
        ];
        let first =
            Window::containing(WindowUnit::Hour, events[0].timestamp.with_timezone(&Tz::UTC))
                .unwrap();
        let mut cursor = WindowCursor::new(&events);

        let (histogram, consumed) = cursor.consume(&first, Tokenization::Words);
        assert_eq!(consumed, 2);
        assert_eq!(histogram.total(), 2);
        assert_eq!(cursor.position(), 2);

        let second = first.following().unwrap();
        let (histogram, consumed) = cursor.consume(&second, Tokenization::Words);
        assert_eq!(consumed, 0);
        assert!(histogram.is_empty());
        assert_eq!(cursor.position(), 2);

        let third = second.following().unwrap();
        let (_, consumed) = cursor.consume(&third, Tokenization::Words);
        assert_eq!(consumed, 1);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_raw_mode_preserves_order_and_is_idempotent() {
        let events = vec![
            Event::new(at(2020, 1, 1, 0, 0, 0), "b a"),
            Event::new(at(2020, 1, 1, 0, 0, 0) + Duration::microseconds(5), "a"),
        ];
        let config = config(Granularity::Raw, Tokenization::Words);

        let one = aggregate(&events, &config, at(2020, 1, 1, 0, 0, 0)).unwrap();
        let two = aggregate(&events, &config, at(2099, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(one, two);
        assert_eq!(
            one.keys(),
            vec![
                "2020-01-01T00:00:00+00:00",
                "2020-01-01T00:00:00.000005+00:00"
            ]
        );
        assert_eq!(one.entries()[0].histogram.total(), 2);
    }

    #[test]
    fn test_raw_mode_empty_input() {
        let series = aggregate(
            &[],
            &config(Granularity::Raw, Tokenization::Words),
            Utc::now(),
        )
        .unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_windowed_empty_input_is_insufficient_data() {
        let err = aggregate(
            &[],
            &config(Granularity::Hour, Tokenization::Words),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, AggregateError::InsufficientData);
    }

    #[test]
    fn test_count_conservation() {
        let texts = ["a b c", "a", "d  e", "", "x y"];
        let events: Vec<Event> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Event::new(at(2020, 1, 1, 0, 0, 0) + Duration::minutes(37 * i as i64), *t))
            .collect();

        let series = aggregate(
            &events,
            &config(Granularity::Hour, Tokenization::Words),
            at(2020, 1, 1, 6, 0, 0),
        )
        .unwrap();

        for entry in &series {
            let window = Window::containing(WindowUnit::Hour, entry.start).unwrap();
            let expected: u64 = events
                .iter()
                .filter(|e| window.contains(e.timestamp))
                .map(|e| e.text.split(' ').count() as u64)
                .sum();
            assert_eq!(entry.histogram.total(), expected);
        }
        assert_eq!(series.total_tokens(), 3 + 1 + 3 + 1 + 2);
    }

    #[test]
    fn test_windows_in_configured_timezone() {
        let events = vec![Event::new(at(2021, 7, 1, 3, 0, 0), "late night")];
        let config = config(Granularity::Day, Tokenization::Full)
            .with_timezone(Tz::America__New_York);

        let series = aggregate(&events, &config, at(2021, 7, 1, 12, 0, 0)).unwrap();
        assert_eq!(
            series.keys(),
            vec!["2021-06-30T00:00:00-04:00", "2021-07-01T00:00:00-04:00"]
        );
        assert_eq!(series.entries()[0].event_count, 1);
    }

    #[test]
    fn test_hourly_keys_across_half_hour_shift() {
        // Lord Howe moves from +10:30 to +11:00 at 02:00 local on 2021-10-03
        let events = vec![
            Event::new(at(2021, 10, 2, 14, 45, 0), "before"),
            Event::new(at(2021, 10, 2, 15, 40, 0), "after"),
        ];
        let config = config(Granularity::Hour, Tokenization::Full)
            .with_timezone(Tz::Australia__Lord_Howe);

        let series = aggregate(&events, &config, at(2021, 10, 2, 16, 10, 0)).unwrap();
        assert_eq!(
            series.keys(),
            vec![
                "2021-10-03T01:00:00+10:30",
                "2021-10-03T02:30:00+11:00",
                "2021-10-03T03:00:00+11:00"
            ]
        );
        assert_eq!(series.total_events(), 2);
        assert_eq!(series.entries()[1].histogram.get("after"), 1);
    }

    #[test]
    fn test_serialization_keeps_chronological_order() {
        let events = vec![
            Event::new(at(2020, 1, 1, 0, 5, 0), "z"),
            Event::new(at(2020, 1, 1, 1, 5, 0), "a"),
        ];
        let series = aggregate(
            &events,
            &config(Granularity::Hour, Tokenization::Words),
            at(2020, 1, 1, 2, 30, 0),
        )
        .unwrap();

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(
            json,
            r#"{"2020-01-01T00:00:00+00:00":{"z":1},"2020-01-01T01:00:00+00:00":{"a":1},"2020-01-01T02:00:00+00:00":{}}"#
        );
    }

    #[test]
    fn test_raw_serialization_merges_shared_timestamps() {
        let t = at(2020, 1, 1, 0, 0, 0);
        let events = vec![Event::new(t, "a b"), Event::new(t, "a")];
        let series = aggregate(
            &events,
            &config(Granularity::Raw, Tokenization::Words),
            t,
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"2020-01-01T00:00:00+00:00":{"a":2,"b":1}}"#);
    }

    #[test]
    fn test_aggregator_with_pinned_now() {
        let events = vec![Event::new(at(2020, 1, 1, 0, 0, 0), "q")];
        let aggregator = Aggregator::new(config(Granularity::Year, Tokenization::Words))
            .with_now(at(2022, 6, 1, 0, 0, 0));
        let series = aggregator.run(&events).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(aggregator.config().granularity, Granularity::Year);
    }
}
