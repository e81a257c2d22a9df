//! Logical days under the 04:30 cutover.
//!
//! A study night that runs past midnight still belongs to the evening it
//! started in: any instant before 04:30 local time is attributed to the
//! previous calendar date. Every aggregation in the crate goes through
//! [`LogicalDay::of`] so the rule is applied uniformly.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Hour of the local cutover between logical days.
pub const CUTOVER_HOUR: u32 = 4;
/// Minute of the local cutover between logical days.
pub const CUTOVER_MINUTE: u32 = 30;

fn cutover() -> Duration {
    Duration::hours(i64::from(CUTOVER_HOUR)) + Duration::minutes(i64::from(CUTOVER_MINUTE))
}

/// Calendar date a timestamp is attributed to under the cutover rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalDay(NaiveDate);

impl LogicalDay {
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Logical day of `at` as seen from a viewer at `offset`.
    ///
    /// 04:30:00.000 local is the first instant of the new day.
    #[must_use]
    pub fn of(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = at.with_timezone(&offset).naive_local();
        Self((local - cutover()).date())
    }

    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// The logical day immediately before this one.
    #[must_use]
    pub fn pred(self) -> Self {
        Self(self.0 - Duration::days(1))
    }

    /// The logical day immediately after this one.
    #[must_use]
    pub fn succ(self) -> Self {
        Self(self.0 + Duration::days(1))
    }

    #[must_use]
    pub fn add_days(self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Monday of the week this logical day falls in.
    #[must_use]
    pub fn week_start(self) -> Self {
        let back = i64::from(self.0.weekday().num_days_from_monday());
        Self(self.0 - Duration::days(back))
    }

    /// Absolute instant at which this logical day begins for a viewer at `offset`.
    #[must_use]
    pub fn start_instant(self, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(CUTOVER_HOUR, CUTOVER_MINUTE, 0)?;
        offset
            .from_local_datetime(&self.0.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}

impl fmt::Display for LogicalDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for LogicalDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Records that can be attributed to a logical day.
pub trait LogicalDated {
    fn logical_day(&self, offset: FixedOffset) -> LogicalDay;
}

/// Inclusive range of logical days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalRange {
    start: LogicalDay,
    end: LogicalDay,
}

impl LogicalRange {
    /// Builds a range; the bounds are swapped if given out of order.
    #[must_use]
    pub fn new(start: LogicalDay, end: LogicalDay) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    #[must_use]
    pub fn single(day: LogicalDay) -> Self {
        Self { start: day, end: day }
    }

    /// Monday through Sunday of the week containing `day`.
    #[must_use]
    pub fn week_of(day: LogicalDay) -> Self {
        let start = day.week_start();
        Self {
            start,
            end: start.add_days(6),
        }
    }

    /// The `days` logical days ending at (and including) `end`.
    #[must_use]
    pub fn ending_at(end: LogicalDay, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end.add_days(-span),
            end,
        }
    }

    /// The range of equal length immediately before this one.
    #[must_use]
    pub fn previous(self) -> Self {
        let len = self.len_days();
        Self {
            start: self.start.add_days(-len),
            end: self.end.add_days(-len),
        }
    }

    /// The week before, for ranges built with [`LogicalRange::week_of`].
    #[must_use]
    pub fn previous_week(self) -> Self {
        Self {
            start: self.start.add_days(-7),
            end: self.end.add_days(-7),
        }
    }

    #[must_use]
    pub fn start(&self) -> LogicalDay {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> LogicalDay {
        self.end
    }

    #[must_use]
    pub fn contains(&self, day: LogicalDay) -> bool {
        self.start <= day && day <= self.end
    }

    #[must_use]
    pub fn len_days(&self) -> i64 {
        (self.end.date() - self.start.date()).num_days() + 1
    }

    /// Iterates the days of the range in order.
    pub fn days(&self) -> impl Iterator<Item = LogicalDay> + use<> {
        let start = self.start;
        (0..self.len_days()).map(move |i| start.add_days(i))
    }
}
