//! Calendar windows for bucketing search events.
//!
//! Windows are half-open `[start, end)` intervals of one calendar unit,
//! computed in a configurable timezone. An event exactly on a boundary
//! belongs to the later window.

use crate::config::Granularity;
use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Length of a window. `Granularity::Raw` has no window unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowUnit {
    Hour,
    Day,
    /// Monday to Monday
    Week,
    Month,
    Year,
}

impl WindowUnit {
    pub fn from_granularity(granularity: Granularity) -> Option<Self> {
        match granularity {
            Granularity::Raw => None,
            Granularity::Hour => Some(WindowUnit::Hour),
            Granularity::Day => Some(WindowUnit::Day),
            Granularity::Week => Some(WindowUnit::Week),
            Granularity::Month => Some(WindowUnit::Month),
            Granularity::Year => Some(WindowUnit::Year),
        }
    }

    /// Start of the unit containing `instant`, on the local wall clock.
    pub fn floor(&self, instant: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let local = instant.naive_local();
        let date = local.date();
        let start = match self {
            WindowUnit::Hour => date.and_hms_opt(local.hour(), 0, 0)?,
            WindowUnit::Day => date.and_hms_opt(0, 0, 0)?,
            WindowUnit::Week => {
                let back = u64::from(date.weekday().num_days_from_monday());
                date.checked_sub_days(Days::new(back))?.and_hms_opt(0, 0, 0)?
            }
            WindowUnit::Month => date.with_day(1)?.and_hms_opt(0, 0, 0)?,
            WindowUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
        };
        resolve_local(&instant.timezone(), start)
    }

    /// Start of the unit after the one beginning at `start`.
    ///
    /// `start` must already be floored. Steps are taken on the local wall
    /// clock, so an hour window next to a half-hour shift is shortened
    /// rather than moved off the hour.
    pub fn next_start(&self, start: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let local = start.naive_local();
        let date = local.date();
        let next = match self {
            WindowUnit::Hour => date
                .and_hms_opt(local.hour(), 0, 0)?
                .checked_add_signed(Duration::hours(1))?,
            WindowUnit::Day => date.checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)?,
            WindowUnit::Week => date.checked_add_days(Days::new(7))?.and_hms_opt(0, 0, 0)?,
            WindowUnit::Month => date
                .with_day(1)?
                .checked_add_months(Months::new(1))?
                .and_hms_opt(0, 0, 0)?,
            WindowUnit::Year => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)?.and_hms_opt(0, 0, 0)?,
        };
        resolve_local(&start.timezone(), next)
    }
}

/// Map a wall-clock time to an instant, preferring the earlier reading when
/// the clock repeats and the next existing reading when it skips.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=16).find_map(|quarter| {
            naive
                .checked_add_signed(Duration::minutes(15 * quarter))
                .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
        }),
    }
}

/// A single calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub unit: WindowUnit,
    /// Inclusive start
    pub start: DateTime<Tz>,
    /// Exclusive end
    pub end: DateTime<Tz>,
}

impl Window {
    /// The window containing `instant`.
    pub fn containing(unit: WindowUnit, instant: DateTime<Tz>) -> Option<Self> {
        let start = unit.floor(instant)?;
        let end = unit.next_start(start)?;
        Some(Self { unit, start, end })
    }

    /// The window immediately after this one.
    pub fn following(&self) -> Option<Self> {
        let end = self.unit.next_start(self.end)?;
        Some(Self {
            unit: self.unit,
            start: self.end,
            end,
        })
    }

    /// Check if a timestamp falls within this window.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let timestamp = timestamp.with_timezone(&self.start.timezone());
        timestamp >= self.start && timestamp < self.end
    }

    /// Check if the window lies entirely before `timestamp`.
    pub fn ends_before(&self, timestamp: DateTime<Utc>) -> bool {
        self.end.with_timezone(&Utc) <= timestamp
    }
}

/// ISO-8601 rendering used for time series keys.
///
/// Seconds are always present; a six-digit fraction is added only when the
/// instant has sub-second precision.
pub fn isoformat(instant: &DateTime<Tz>) -> String {
    let micros = instant.timestamp_subsec_micros();
    if micros == 0 {
        instant.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        format!(
            "{}.{:06}{}",
            instant.format("%Y-%m-%dT%H:%M:%S"),
            micros,
            instant.format("%:z")
        )
    }
}
