use thiserror::Error;

use crate::day::LogicalDay;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum StreakSettingsError {
    #[error("minimum study hours must be between 0 and 24, got {0}")]
    InvalidHours(f64),
}

/// Thresholds a logical day must meet to extend the streak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakSettings {
    min_study_hours: f64,
    min_questions: u32,
}

impl StreakSettings {
    pub const DEFAULT_MIN_STUDY_HOURS: f64 = 10.0;
    pub const DEFAULT_MIN_QUESTIONS: u32 = 60;

    /// # Errors
    ///
    /// Returns `StreakSettingsError::InvalidHours` unless `min_study_hours` is
    /// finite and within a single day.
    pub fn new(min_study_hours: f64, min_questions: u32) -> Result<Self, StreakSettingsError> {
        if !min_study_hours.is_finite() || !(0.0..=24.0).contains(&min_study_hours) {
            return Err(StreakSettingsError::InvalidHours(min_study_hours));
        }
        Ok(Self {
            min_study_hours,
            min_questions,
        })
    }

    #[must_use]
    pub fn min_study_hours(&self) -> f64 {
        self.min_study_hours
    }

    #[must_use]
    pub fn min_questions(&self) -> u32 {
        self.min_questions
    }
}

impl Default for StreakSettings {
    fn default() -> Self {
        Self {
            min_study_hours: Self::DEFAULT_MIN_STUDY_HOURS,
            min_questions: Self::DEFAULT_MIN_QUESTIONS,
        }
    }
}

/// Outcome of the latest evaluation of one logical day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakDay {
    pub day: LogicalDay,
    pub qualified: bool,
    /// Current streak right after this day was evaluated.
    pub streak: u32,
}

/// Running streak plus its per-day history.
///
/// History is ordered by day and holds at most one entry per logical day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakState {
    current: u32,
    longest: u32,
    last_streak_day: Option<LogicalDay>,
    history: Vec<StreakDay>,
}

impl StreakState {
    /// Rehydrate from storage. History entries are re-sorted and deduplicated
    /// (last one wins), and `longest` is raised to at least `current`.
    #[must_use]
    pub fn from_persisted(
        current: u32,
        longest: u32,
        last_streak_day: Option<LogicalDay>,
        history: Vec<StreakDay>,
    ) -> Self {
        let mut state = Self {
            current,
            longest: longest.max(current),
            last_streak_day,
            history: Vec::with_capacity(history.len()),
        };
        for entry in history {
            state.upsert(entry);
        }
        state
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn longest(&self) -> u32 {
        self.longest
    }

    #[must_use]
    pub fn last_streak_day(&self) -> Option<LogicalDay> {
        self.last_streak_day
    }

    #[must_use]
    pub fn history(&self) -> &[StreakDay] {
        &self.history
    }

    #[must_use]
    pub fn entry(&self, day: LogicalDay) -> Option<&StreakDay> {
        self.history
            .binary_search_by_key(&day, |e| e.day)
            .ok()
            .map(|idx| &self.history[idx])
    }

    pub(crate) fn set_current(&mut self, current: u32) {
        self.current = current;
        self.longest = self.longest.max(current);
    }

    pub(crate) fn set_last_streak_day(&mut self, day: Option<LogicalDay>) {
        self.last_streak_day = day;
    }

    pub(crate) fn upsert(&mut self, entry: StreakDay) {
        match self.history.binary_search_by_key(&entry.day, |e| e.day) {
            Ok(idx) => self.history[idx] = entry,
            Err(idx) => self.history.insert(idx, entry),
        }
    }
}
