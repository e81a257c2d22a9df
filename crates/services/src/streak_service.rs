use storage::Snapshots;
use storage::repository::StorageError;
use study_core::aggregate::daily_totals;
use study_core::day::LogicalRange;
use study_core::exam::ExamConfig;
use study_core::model::{StreakSettings, StreakState, StudySession};
use study_core::streak::{evaluate, replay};
use tracing::debug;

use crate::Clock;

/// Re-evaluates and persists the daily streak.
#[derive(Clone)]
pub struct StreakService {
    clock: Clock,
    snapshots: Snapshots,
}

impl StreakService {
    #[must_use]
    pub fn new(clock: Clock, snapshots: Snapshots) -> Self {
        Self { clock, snapshots }
    }

    /// Evaluate the clock's logical day against the stored sessions and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading or saving fails.
    pub async fn refresh(&self) -> Result<StreakState, StorageError> {
        let sessions = self.snapshots.load_sessions().await?;
        self.refresh_with(&sessions).await
    }

    /// Same as [`StreakService::refresh`] for a session set the caller already holds.
    pub(crate) async fn refresh_with(
        &self,
        sessions: &[StudySession],
    ) -> Result<StreakState, StorageError> {
        let settings = self.snapshots.load_settings().await?;
        let previous = self.snapshots.load_streak().await?;
        let today = self.clock.today();

        let totals = daily_totals(in_scope(sessions, settings.exam().config()), self.clock.offset());
        let next = evaluate(&previous, &totals, today, &settings.streak());

        if next != previous {
            debug!(
                day = %today,
                from = previous.current(),
                to = next.current(),
                longest = next.longest(),
                "streak updated"
            );
            self.snapshots.save_streak(&next).await?;
        }
        Ok(next)
    }

    /// Stored streak state, without re-evaluating.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading fails.
    pub async fn state(&self) -> Result<StreakState, StorageError> {
        self.snapshots.load_streak().await
    }

    /// Rebuild the streak from scratch over the last `days` logical days,
    /// ending today, and persist it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading or saving fails.
    pub async fn rebuild(&self, days: u32) -> Result<StreakState, StorageError> {
        let sessions = self.snapshots.load_sessions().await?;
        let settings = self.snapshots.load_settings().await?;
        let range = LogicalRange::ending_at(self.clock.today(), days);

        let totals = daily_totals(in_scope(&sessions, settings.exam().config()), self.clock.offset());
        let rebuilt = replay(&totals, &range, &settings.streak());
        debug!(
            from = %range.start(),
            to = %range.end(),
            current = rebuilt.current(),
            longest = rebuilt.longest(),
            "streak rebuilt"
        );
        self.snapshots.save_streak(&rebuilt).await?;
        Ok(rebuilt)
    }

    /// Thresholds currently in force.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading fails.
    pub async fn thresholds(&self) -> Result<StreakSettings, StorageError> {
        Ok(self.snapshots.load_settings().await?.streak())
    }
}

fn in_scope<'a>(
    sessions: &'a [StudySession],
    exam: &'a ExamConfig,
) -> impl Iterator<Item = &'a StudySession> {
    sessions.iter().filter(|s| exam.allows(s.subject()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use storage::repository::InMemoryStore;
    use study_core::exam::ExamType;
    use study_core::model::{SessionDraft, SessionId, Subject};
    use study_core::time::fixed_clock;

    fn long_day(clock: &Clock) -> Vec<StudySession> {
        // 10h of study and 60 questions, ending before the clock's instant.
        let start = clock.now() - Duration::hours(11);
        vec![
            SessionDraft::new(Subject::Physics, start, start + Duration::hours(6))
                .with_questions(35)
                .validate(ExamType::Jee.config())
                .unwrap()
                .assign_id(SessionId::generate()),
            SessionDraft::new(
                Subject::Chemistry,
                start + Duration::hours(6),
                start + Duration::hours(10),
            )
            .with_questions(25)
            .validate(ExamType::Jee.config())
            .unwrap()
            .assign_id(SessionId::generate()),
        ]
    }

    #[tokio::test]
    async fn refresh_credits_a_qualifying_day_once() {
        let clock = fixed_clock();
        let snapshots = Snapshots::new(Arc::new(InMemoryStore::new()));
        snapshots.save_sessions(&long_day(&clock)).await.unwrap();
        let service = StreakService::new(clock, snapshots.clone());

        let state = service.refresh().await.unwrap();
        assert_eq!(state.current(), 1);
        assert_eq!(state.last_streak_day(), Some(clock.today()));

        let again = service.refresh().await.unwrap();
        assert_eq!(again, state);
        assert_eq!(service.state().await.unwrap(), state);
    }

    #[tokio::test]
    async fn rebuild_replays_history() {
        let clock = fixed_clock();
        let snapshots = Snapshots::new(Arc::new(InMemoryStore::new()));
        let mut sessions = long_day(&clock);
        let mut yesterday = Clock::fixed_utc(clock.now());
        yesterday.advance(Duration::days(-1));
        sessions.extend(long_day(&yesterday));
        snapshots.save_sessions(&sessions).await.unwrap();

        let service = StreakService::new(clock, snapshots);
        let rebuilt = service.rebuild(3).await.unwrap();
        assert_eq!(rebuilt.current(), 2);
        assert_eq!(rebuilt.history().len(), 3);
        assert!(!rebuilt.history()[0].qualified);
    }
}
