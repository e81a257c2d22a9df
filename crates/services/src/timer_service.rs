use chrono::Duration;
use storage::Snapshots;
use study_core::model::{StudySession, Subject, TaskId};
use study_core::timer::StudyTimer;
use tracing::debug;

use crate::Clock;
use crate::error::TimerServiceError;
use crate::session_log_service::SessionLogService;

/// Snapshot of the active timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerStatus {
    pub timer: StudyTimer,
    pub elapsed: Duration,
}

/// Drives the single persisted study timer.
#[derive(Clone)]
pub struct TimerService {
    clock: Clock,
    snapshots: Snapshots,
    sessions: SessionLogService,
}

impl TimerService {
    #[must_use]
    pub fn new(clock: Clock, snapshots: Snapshots, sessions: SessionLogService) -> Self {
        Self {
            clock,
            snapshots,
            sessions,
        }
    }

    /// Start timing `subject`, optionally against one of the user's tasks.
    ///
    /// # Errors
    ///
    /// Returns `TimerServiceError::AlreadyActive` if a timer is running or paused,
    /// `TimerServiceError::TaskNotFound` for an unknown goal task, and
    /// `TimerServiceError::SubjectNotInExam` if the exam does not allow the subject.
    pub async fn start(
        &self,
        subject: Subject,
        goal: Option<TaskId>,
    ) -> Result<StudyTimer, TimerServiceError> {
        if self.snapshots.load_timer().await?.is_some() {
            return Err(TimerServiceError::AlreadyActive);
        }

        let exam = self.snapshots.load_settings().await?.exam();
        if !exam.config().allows(subject) {
            return Err(TimerServiceError::SubjectNotInExam(subject));
        }

        let goal = match goal {
            Some(task_id) => {
                let tasks = self.snapshots.load_tasks().await?;
                let task = tasks
                    .iter()
                    .find(|t| t.id() == task_id)
                    .ok_or(TimerServiceError::TaskNotFound(task_id))?;
                Some(task.as_goal())
            }
            None => None,
        };

        let timer = StudyTimer::start(subject, goal, self.clock.now());
        self.snapshots.save_timer(Some(&timer)).await?;
        debug!(subject = %subject, "timer started");
        Ok(timer)
    }

    /// # Errors
    ///
    /// Returns `TimerServiceError::NoActiveTimer` without a timer and
    /// `TimerServiceError::Timer` if it is already paused.
    pub async fn pause(&self) -> Result<TimerStatus, TimerServiceError> {
        let timer = self.active().await?.pause(self.clock.now())?;
        self.snapshots.save_timer(Some(&timer)).await?;
        Ok(self.status_of(timer))
    }

    /// # Errors
    ///
    /// Returns `TimerServiceError::NoActiveTimer` without a timer and
    /// `TimerServiceError::Timer` if it is not paused.
    pub async fn resume(&self) -> Result<TimerStatus, TimerServiceError> {
        let timer = self.active().await?.resume(self.clock.now())?;
        self.snapshots.save_timer(Some(&timer)).await?;
        Ok(self.status_of(timer))
    }

    /// Stop the timer and log the session. The session and the cleared timer
    /// are written together, so on failure the timer stays active and no
    /// session is stored.
    ///
    /// # Errors
    ///
    /// Returns `TimerServiceError::NoActiveTimer` without a timer,
    /// `TimerServiceError::Timer` if under one second was timed, and
    /// `TimerServiceError::Session` if the session cannot be recorded.
    pub async fn stop(
        &self,
        questions: u32,
        notes: Option<String>,
    ) -> Result<StudySession, TimerServiceError> {
        let timer = self.active().await?;
        let mut draft = timer.stop(self.clock.now())?.with_questions(questions);
        draft.notes = notes;

        Ok(self.sessions.record_timer(draft).await?)
    }

    /// The active timer, if any.
    ///
    /// # Errors
    ///
    /// Returns `TimerServiceError::Storage` if loading fails.
    pub async fn status(&self) -> Result<Option<TimerStatus>, TimerServiceError> {
        Ok(self
            .snapshots
            .load_timer()
            .await?
            .map(|timer| self.status_of(timer)))
    }

    async fn active(&self) -> Result<StudyTimer, TimerServiceError> {
        self.snapshots
            .load_timer()
            .await?
            .ok_or(TimerServiceError::NoActiveTimer)
    }

    fn status_of(&self, timer: StudyTimer) -> TimerStatus {
        let elapsed = timer.elapsed(self.clock.now());
        TimerStatus { timer, elapsed }
    }
}
