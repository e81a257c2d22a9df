use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::day::{LogicalDated, LogicalDay};
use crate::exam::ExamConfig;
use crate::model::{GoalRef, Subject, TaskId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("subject {0} is not part of the active exam")]
    SubjectNotInExam(Subject),
}

/// A per-subject to-do item that sessions may be attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    title: String,
    subject: Subject,
    completed: bool,
    created_at: DateTime<Utc>,
}

fn normalize_title(title: impl Into<String>) -> Result<String, TaskError> {
    let raw = title.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

impl Task {
    /// Create a new, open task.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` for a blank title and
    /// `TaskError::SubjectNotInExam` if the exam does not allow the subject.
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        subject: Subject,
        exam: &ExamConfig,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        if !exam.allows(subject) {
            return Err(TaskError::SubjectNotInExam(subject));
        }
        Ok(Self {
            id,
            title: normalize_title(title)?,
            subject,
            completed: false,
            created_at,
        })
    }

    /// Rehydrate a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the stored title is blank.
    pub fn from_persisted(
        id: TaskId,
        title: String,
        subject: Subject,
        completed: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        Ok(Self {
            id,
            title: normalize_title(title)?,
            subject,
            completed,
            created_at,
        })
    }

    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }

    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` for a blank title.
    pub fn renamed(&self, title: impl Into<String>) -> Result<Self, TaskError> {
        Ok(Self {
            title: normalize_title(title)?,
            ..self.clone()
        })
    }

    /// Snapshot of this task for attaching to a session.
    #[must_use]
    pub fn as_goal(&self) -> GoalRef {
        GoalRef::new(self.id, self.title.clone())
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl LogicalDated for Task {
    fn logical_day(&self, offset: FixedOffset) -> LogicalDay {
        LogicalDay::of(self.created_at, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::ExamType;
    use crate::time::fixed_now;

    #[test]
    fn title_is_trimmed_and_required() {
        let exam = ExamType::Jee.config();
        let task = Task::new(TaskId::generate(), "  Rotational motion ", Subject::Physics, exam, fixed_now())
            .unwrap();
        assert_eq!(task.title(), "Rotational motion");

        let err = Task::new(TaskId::generate(), " ", Subject::Physics, exam, fixed_now()).unwrap_err();
        assert_eq!(err, TaskError::EmptyTitle);
    }

    #[test]
    fn subject_must_fit_exam() {
        let err = Task::new(
            TaskId::generate(),
            "Plant kingdom",
            Subject::Botany,
            ExamType::Jee.config(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, TaskError::SubjectNotInExam(Subject::Botany));
    }

    #[test]
    fn toggle_flips_completion_and_goal_snapshots_title() {
        let task = Task::new(
            TaskId::generate(),
            "Organic named reactions",
            Subject::Chemistry,
            ExamType::Neet.config(),
            fixed_now(),
        )
        .unwrap();
        assert!(task.toggled().is_completed());
        assert!(!task.toggled().toggled().is_completed());

        let goal = task.as_goal();
        assert_eq!(goal.task_id, task.id());
        assert_eq!(goal.title, "Organic named reactions");
    }
}
