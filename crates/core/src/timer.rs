use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{GoalRef, SessionDraft, Subject};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimerError {
    #[error("timer is already paused")]
    NotRunning,

    #[error("timer is not paused")]
    NotPaused,

    #[error("timer ran for less than one second")]
    TooShort,

    #[error("stored timer state is inconsistent")]
    Inconsistent,
}

/// Upper bound on stored running time: one leap year.
pub const MAX_ACCUMULATED_SECS: i64 = 366 * 86_400;

/// A running or paused study timer.
///
/// Only running time counts: the session produced by [`StudyTimer::stop`]
/// starts at the first start and lasts exactly the accumulated running time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyTimer {
    subject: Subject,
    goal: Option<GoalRef>,
    started_at: DateTime<Utc>,
    accumulated_secs: i64,
    running_since: Option<DateTime<Utc>>,
}

impl StudyTimer {
    #[must_use]
    pub fn start(subject: Subject, goal: Option<GoalRef>, now: DateTime<Utc>) -> Self {
        Self {
            subject,
            goal,
            started_at: now,
            accumulated_secs: 0,
            running_since: Some(now),
        }
    }

    /// # Errors
    ///
    /// Returns `TimerError::Inconsistent` if the accumulated time is negative or
    /// above [`MAX_ACCUMULATED_SECS`], or a running segment began before the
    /// timer itself.
    pub fn from_persisted(
        subject: Subject,
        goal: Option<GoalRef>,
        started_at: DateTime<Utc>,
        accumulated_secs: i64,
        running_since: Option<DateTime<Utc>>,
    ) -> Result<Self, TimerError> {
        if !(0..=MAX_ACCUMULATED_SECS).contains(&accumulated_secs)
            || running_since.is_some_and(|since| since < started_at)
        {
            return Err(TimerError::Inconsistent);
        }
        Ok(Self {
            subject,
            goal,
            started_at,
            accumulated_secs,
            running_since,
        })
    }

    /// # Errors
    ///
    /// Returns `TimerError::NotRunning` if the timer is already paused and
    /// `TimerError::Inconsistent` if the total would exceed [`MAX_ACCUMULATED_SECS`].
    pub fn pause(&self, now: DateTime<Utc>) -> Result<Self, TimerError> {
        if self.running_since.is_none() {
            return Err(TimerError::NotRunning);
        }
        Ok(Self {
            accumulated_secs: self.running_secs(now)?,
            running_since: None,
            ..self.clone()
        })
    }

    /// # Errors
    ///
    /// Returns `TimerError::NotPaused` if the timer is running.
    pub fn resume(&self, now: DateTime<Utc>) -> Result<Self, TimerError> {
        if self.running_since.is_some() {
            return Err(TimerError::NotPaused);
        }
        Ok(Self {
            running_since: Some(now),
            ..self.clone()
        })
    }

    /// Running time so far, excluding paused spans. Saturates at
    /// [`MAX_ACCUMULATED_SECS`].
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let secs = self.running_secs(now).unwrap_or(MAX_ACCUMULATED_SECS);
        Duration::try_seconds(secs).unwrap_or(Duration::MAX)
    }

    fn running_secs(&self, now: DateTime<Utc>) -> Result<i64, TimerError> {
        let running = self
            .running_since
            .map_or(0, |since| segment_secs(since, now));
        self.accumulated_secs
            .checked_add(running)
            .filter(|secs| *secs <= MAX_ACCUMULATED_SECS)
            .ok_or(TimerError::Inconsistent)
    }

    /// Finish the timer and turn it into a session draft.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::TooShort` if less than one second was timed and
    /// `TimerError::Inconsistent` if the running time is out of range.
    pub fn stop(self, now: DateTime<Utc>) -> Result<SessionDraft, TimerError> {
        let secs = self.running_secs(now)?;
        if secs < 1 {
            return Err(TimerError::TooShort);
        }
        let ended_at = Duration::try_seconds(secs)
            .and_then(|elapsed| self.started_at.checked_add_signed(elapsed))
            .ok_or(TimerError::Inconsistent)?;
        let mut draft = SessionDraft::new(self.subject, self.started_at, ended_at);
        draft.goal = self.goal;
        Ok(draft)
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn goal(&self) -> Option<&GoalRef> {
        self.goal.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn accumulated_secs(&self) -> i64 {
        self.accumulated_secs
    }

    #[must_use]
    pub fn running_since(&self) -> Option<DateTime<Utc>> {
        self.running_since
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }
}

// Clock skew backwards never subtracts time.
fn segment_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(since).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskId;
    use crate::time::fixed_now;

    #[test]
    fn paused_time_is_not_counted() {
        let t0 = fixed_now();
        let timer = StudyTimer::start(Subject::Physics, None, t0);
        let paused = timer.pause(t0 + Duration::minutes(25)).unwrap();
        assert!(!paused.is_running());
        assert_eq!(paused.elapsed(t0 + Duration::hours(3)), Duration::minutes(25));

        let resumed = paused.resume(t0 + Duration::minutes(40)).unwrap();
        let draft = resumed.stop(t0 + Duration::minutes(50)).unwrap();
        assert_eq!(draft.started_at, t0);
        assert_eq!(draft.ended_at, t0 + Duration::minutes(35));
        assert_eq!(draft.subject, Subject::Physics);
    }

    #[test]
    fn pause_and_resume_reject_wrong_state() {
        let t0 = fixed_now();
        let timer = StudyTimer::start(Subject::Chemistry, None, t0);
        assert_eq!(timer.resume(t0), Err(TimerError::NotPaused));
        let paused = timer.pause(t0 + Duration::seconds(5)).unwrap();
        assert_eq!(paused.pause(t0), Err(TimerError::NotRunning));
    }

    #[test]
    fn sub_second_timer_cannot_stop() {
        let t0 = fixed_now();
        let timer = StudyTimer::start(Subject::Mathematics, None, t0);
        assert_eq!(
            timer.stop(t0 + Duration::milliseconds(700)),
            Err(TimerError::TooShort)
        );
    }

    #[test]
    fn goal_is_carried_into_draft() {
        let t0 = fixed_now();
        let goal = GoalRef::new(TaskId::generate(), "Rotational dynamics");
        let draft = StudyTimer::start(Subject::Physics, Some(goal.clone()), t0)
            .stop(t0 + Duration::minutes(10))
            .unwrap();
        assert_eq!(draft.goal, Some(goal));
    }

    #[test]
    fn persisted_state_is_checked() {
        let t0 = fixed_now();
        assert_eq!(
            StudyTimer::from_persisted(Subject::Physics, None, t0, -1, None),
            Err(TimerError::Inconsistent)
        );
        assert_eq!(
            StudyTimer::from_persisted(
                Subject::Physics,
                None,
                t0,
                0,
                Some(t0 - Duration::seconds(1))
            ),
            Err(TimerError::Inconsistent)
        );
    }

    #[test]
    fn oversized_accumulation_is_rejected_not_panicking() {
        let t0 = fixed_now();
        assert_eq!(
            StudyTimer::from_persisted(Subject::Physics, None, t0, 9_000_000_000_000_000_000, None),
            Err(TimerError::Inconsistent)
        );

        let full =
            StudyTimer::from_persisted(Subject::Physics, None, t0, MAX_ACCUMULATED_SECS, Some(t0))
                .unwrap();
        let later = t0 + Duration::hours(1);
        assert_eq!(full.elapsed(later), Duration::seconds(MAX_ACCUMULATED_SECS));
        assert_eq!(full.pause(later), Err(TimerError::Inconsistent));
        assert_eq!(full.stop(later), Err(TimerError::Inconsistent));
    }
}
