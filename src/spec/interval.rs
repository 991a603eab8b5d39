//! Granularity and interval bounds over millisecond positions.
//!
//! Positions are milliseconds since the Unix epoch, UTC. A bound given at a
//! coarser granularity stands for every instant in its unit, so `2020-03` at
//! month granularity starts at the first millisecond of March and finishes at
//! the last one.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::error::{SpecError, SpecResult};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Calendar units a position can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Granularity {
    /// First millisecond of the unit containing `position`.
    pub fn earliest(self, position: i64) -> i64 {
        match self.fixed_width() {
            Some(width) => position - position.rem_euclid(width),
            None => self.calendar_start(position).unwrap_or(position),
        }
    }

    /// Last millisecond of the unit containing `position`.
    pub fn latest(self, position: i64) -> i64 {
        match self.fixed_width() {
            Some(width) => self.earliest(position) + width - 1,
            None => self
                .calendar_start(position)
                .and_then(|start| self.next_calendar_start(start))
                .map(|next| next - 1)
                .unwrap_or(position),
        }
    }

    fn fixed_width(self) -> Option<i64> {
        match self {
            Granularity::Millisecond => Some(1),
            Granularity::Second => Some(MS_PER_SECOND),
            Granularity::Minute => Some(MS_PER_MINUTE),
            Granularity::Hour => Some(MS_PER_HOUR),
            Granularity::Day => Some(MS_PER_DAY),
            Granularity::Month | Granularity::Year => None,
        }
    }

    fn calendar_start(self, position: i64) -> Option<i64> {
        let dt = position_to_datetime(position)?;
        let month = if self == Granularity::Year { 1 } else { dt.month() };
        let start = NaiveDate::from_ymd_opt(dt.year(), month, 1)?.and_hms_opt(0, 0, 0)?;
        Some(datetime_to_position(&start))
    }

    fn next_calendar_start(self, start: i64) -> Option<i64> {
        let dt = position_to_datetime(start)?;
        let (year, month) = match self {
            Granularity::Year => (dt.year() + 1, 1),
            _ if dt.month() == 12 => (dt.year() + 1, 1),
            _ => (dt.year(), dt.month() + 1),
        };
        let next = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
        Some(datetime_to_position(&next))
    }
}

/// Convert a millisecond position to a UTC date-time.
pub fn position_to_datetime(position: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(position).map(|dt| dt.naive_utc())
}

/// Convert a UTC date-time to a millisecond position.
pub fn datetime_to_position(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Expanded bounds of an interval whose ends may be coarse or open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub min_start: Option<i64>,
    pub max_start: Option<i64>,
    pub min_finish: Option<i64>,
    pub max_finish: Option<i64>,
}

impl Interval {
    /// Build the interval. A missing bound is unbounded; a bound without a
    /// granularity is exact.
    pub fn new(
        start: Option<i64>,
        start_granularity: Option<Granularity>,
        finish: Option<i64>,
        finish_granularity: Option<Granularity>,
    ) -> SpecResult<Self> {
        if let (Some(s), Some(f)) = (start, finish) {
            if s > f {
                return Err(SpecError::InvalidFilter(format!(
                    "interval start {} is after finish {}",
                    s, f
                )));
            }
        }

        let expand = |pos: Option<i64>, gran: Option<Granularity>| match (pos, gran) {
            (Some(p), Some(g)) => (Some(g.earliest(p)), Some(g.latest(p))),
            (Some(p), None) => (Some(p), Some(p)),
            (None, _) => (None, None),
        };
        let (min_start, max_start) = expand(start, start_granularity);
        let (min_finish, max_finish) = expand(finish, finish_granularity);

        Ok(Self {
            min_start,
            max_start,
            min_finish,
            max_finish,
        })
    }
}
