use chrono::{DateTime, Duration, FixedOffset, Local, Utc};

use crate::day::LogicalDay;

/// A clock abstraction for deterministic time in services and tests.
///
/// Besides the current instant it supplies the viewer's UTC offset, which is
/// the only place local wall-clock time enters the day-boundary rules.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<FixedOffset>),
}

impl Clock {
    /// Returns a clock that uses the current system time and local offset.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock fixed at the given local timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<FixedOffset>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a clock fixed at the given UTC instant, viewed from UTC.
    #[must_use]
    pub fn fixed_utc(at: DateTime<Utc>) -> Self {
        Self::Fixed(at.fixed_offset())
    }

    /// Returns the current instant according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => t.with_timezone(&Utc),
        }
    }

    /// Returns the viewer's UTC offset.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        match self {
            Clock::System => *Local::now().fixed_offset().offset(),
            Clock::Fixed(t) => *t.offset(),
        }
    }

    /// Returns the logical day the current instant belongs to.
    #[must_use]
    pub fn today(&self) -> LogicalDay {
        LogicalDay::of(self.now(), self.offset())
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp, viewed from UTC.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed_utc(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_instant_and_offset() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let clock = Clock::fixed(fixed_now().with_timezone(&offset));

        assert_eq!(clock.now(), fixed_now());
        assert_eq!(clock.offset(), offset);
    }

    #[test]
    fn advance_moves_fixed_clock_only() {
        let mut clock = fixed_clock();
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), fixed_now() + Duration::hours(2));

        let mut system = Clock::system();
        system.advance(Duration::hours(2));
        assert!(!system.is_fixed());
    }
}
