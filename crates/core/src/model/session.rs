use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::day::{LogicalDated, LogicalDay};
use crate::exam::ExamConfig;
use crate::model::{SessionId, Subject, TaskId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session must end after it starts")]
    InvalidTimeRange,

    #[error("session must last at least one second")]
    TooShort,

    #[error("question count cannot be negative: {0}")]
    NegativeQuestions(i64),

    #[error("stored duration {stored}s does not match the time range ({derived}s)")]
    DurationMismatch { stored: u64, derived: u64 },

    #[error("subject {0} is not part of the active exam")]
    SubjectNotInExam(Subject),
}

/// Task a session was attributed to, with the title as it was when the
/// session was logged. The snapshot stays valid after the task is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalRef {
    pub task_id: TaskId,
    pub title: String,
}

impl GoalRef {
    #[must_use]
    pub fn new(task_id: TaskId, title: impl Into<String>) -> Self {
        Self {
            task_id,
            title: title.into(),
        }
    }
}

/// Unvalidated input for a new session, from a stopped timer or a manual entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub subject: Subject,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub questions: u32,
    pub goal: Option<GoalRef>,
    pub notes: Option<String>,
}

impl SessionDraft {
    #[must_use]
    pub fn new(subject: Subject, started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        Self {
            subject,
            started_at,
            ended_at,
            questions: 0,
            goal: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn with_questions(mut self, questions: u32) -> Self {
        self.questions = questions;
        self
    }

    #[must_use]
    pub fn with_goal(mut self, goal: GoalRef) -> Self {
        self.goal = Some(goal);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Validate the draft against the time-range invariant and the exam's subject set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SubjectNotInExam` if the exam does not allow the subject,
    /// or the time-range errors of [`session_duration`].
    pub fn validate(self, exam: &ExamConfig) -> Result<ValidatedSession, SessionError> {
        if !exam.allows(self.subject) {
            return Err(SessionError::SubjectNotInExam(self.subject));
        }
        let duration_secs = session_duration(self.started_at, self.ended_at)?;
        Ok(ValidatedSession {
            subject: self.subject,
            duration_secs,
            started_at: self.started_at,
            ended_at: self.ended_at,
            questions: self.questions,
            goal: self.goal,
            notes: normalize_notes(self.notes),
        })
    }
}

/// A draft that passed validation but has no identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSession {
    subject: Subject,
    duration_secs: u64,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    questions: u32,
    goal: Option<GoalRef>,
    notes: Option<String>,
}

impl ValidatedSession {
    #[must_use]
    pub fn assign_id(self, id: SessionId) -> StudySession {
        StudySession {
            id,
            subject: self.subject,
            duration_secs: self.duration_secs,
            started_at: self.started_at,
            ended_at: self.ended_at,
            questions: self.questions,
            goal: self.goal,
            notes: self.notes,
        }
    }
}

/// One timed study session.
///
/// `duration_secs` is always `floor(ended_at - started_at)` in whole seconds
/// and strictly positive; every constructor and edit re-checks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    id: SessionId,
    subject: Subject,
    duration_secs: u64,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    questions: u32,
    goal: Option<GoalRef>,
    notes: Option<String>,
}

/// Whole seconds between `start` and `end`.
///
/// # Errors
///
/// Returns `SessionError::InvalidTimeRange` if `end <= start` and
/// `SessionError::TooShort` if the span is under one second.
pub fn session_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64, SessionError> {
    if end <= start {
        return Err(SessionError::InvalidTimeRange);
    }
    let secs = (end - start).num_seconds();
    match u64::try_from(secs) {
        Ok(0) | Err(_) => Err(SessionError::TooShort),
        Ok(secs) => Ok(secs),
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

impl StudySession {
    /// Rehydrate a session from persisted storage.
    ///
    /// The exam scope is not checked here; out-of-scope sessions are removed
    /// by the exam migration, not on load.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the time range is invalid, the question count
    /// is negative, or the stored duration disagrees with the range.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        subject: Subject,
        duration_secs: u64,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        questions: i64,
        goal: Option<GoalRef>,
        notes: Option<String>,
    ) -> Result<Self, SessionError> {
        let derived = session_duration(started_at, ended_at)?;
        if derived != duration_secs {
            return Err(SessionError::DurationMismatch {
                stored: duration_secs,
                derived,
            });
        }
        let questions =
            u32::try_from(questions).map_err(|_| SessionError::NegativeQuestions(questions))?;

        Ok(Self {
            id,
            subject,
            duration_secs,
            started_at,
            ended_at,
            questions,
            goal,
            notes,
        })
    }

    /// Returns a copy ending at `ended_at`, with the duration recomputed.
    ///
    /// # Errors
    ///
    /// Returns the time-range errors of [`session_duration`].
    pub fn with_end(&self, ended_at: DateTime<Utc>) -> Result<Self, SessionError> {
        let duration_secs = session_duration(self.started_at, ended_at)?;
        Ok(Self {
            ended_at,
            duration_secs,
            ..self.clone()
        })
    }

    /// Returns a copy with a new question count.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NegativeQuestions` for negative input.
    pub fn with_questions(&self, questions: i64) -> Result<Self, SessionError> {
        let questions =
            u32::try_from(questions).map_err(|_| SessionError::NegativeQuestions(questions))?;
        Ok(Self {
            questions,
            ..self.clone()
        })
    }

    /// Returns a copy with replaced notes; blank notes are stored as absent.
    #[must_use]
    pub fn with_notes(&self, notes: Option<String>) -> Self {
        Self {
            notes: normalize_notes(notes),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    /// Questions solved; meaningless for `Subject::Classes`.
    #[must_use]
    pub fn questions(&self) -> u32 {
        self.questions
    }

    #[must_use]
    pub fn goal(&self) -> Option<&GoalRef> {
        self.goal.as_ref()
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl LogicalDated for StudySession {
    fn logical_day(&self, offset: FixedOffset) -> LogicalDay {
        LogicalDay::of(self.started_at, offset)
    }
}
