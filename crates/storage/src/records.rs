//! Persisted JSON shapes.
//!
//! These mirror the domain types so the snapshot codec can serialize and
//! deserialize without leaking storage concerns into the domain layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use study_core::day::LogicalDay;
use study_core::exam::ExamType;
use study_core::model::{
    AppSettings, GoalRef, SessionError, SessionId, StreakDay, StreakSettings, StreakState,
    StudySession, Subject, SubjectScore, Task, TaskError, TaskId, TestRecord, TestRecordError,
    TestRecordId,
};
use study_core::timer::{StudyTimer, TimerError};

fn goal_parts(goal: Option<&GoalRef>) -> (Option<TaskId>, Option<String>) {
    goal.map_or((None, None), |g| (Some(g.task_id), Some(g.title.clone())))
}

fn goal_from_parts(task_id: Option<TaskId>, title: Option<String>) -> Option<GoalRef> {
    task_id.map(|id| GoalRef::new(id, title.unwrap_or_default()))
}

//
// ─── SESSIONS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    pub subject: Subject,
    /// Whole seconds, always derived from the time range.
    pub duration: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub questions: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionRecord {
    #[must_use]
    pub fn from_session(session: &StudySession) -> Self {
        let (goal_task_id, goal_title) = goal_parts(session.goal());
        Self {
            id: session.id(),
            subject: session.subject(),
            duration: session.duration_secs(),
            start_time: session.started_at(),
            end_time: session.ended_at(),
            questions: i64::from(session.questions()),
            goal_task_id,
            goal_title,
            notes: session.notes().map(str::to_owned),
        }
    }

    /// Convert the record back into a domain `StudySession`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the stored range, duration or question count is invalid.
    pub fn into_session(self) -> Result<StudySession, SessionError> {
        StudySession::from_persisted(
            self.id,
            self.subject,
            self.duration,
            self.start_time,
            self.end_time,
            self.questions,
            goal_from_parts(self.goal_task_id, self.goal_title),
            self.notes,
        )
    }
}

//
// ─── TASKS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub subject: Subject,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_owned(),
            subject: task.subject(),
            completed: task.is_completed(),
            created_at: task.created_at(),
        }
    }

    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the stored title is blank.
    pub fn into_task(self) -> Result<Task, TaskError> {
        Task::from_persisted(
            self.id,
            self.title,
            self.subject,
            self.completed,
            self.created_at,
        )
    }
}

//
// ─── TEST RECORDS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScoreRecord {
    pub subject: Subject,
    pub score: i32,
    pub attempted: u32,
    pub correct: u32,
    /// Derived on write; ignored on read.
    #[serde(default)]
    pub incorrect: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecordRecord {
    pub id: TestRecordId,
    pub exam: ExamType,
    pub date: NaiveDate,
    /// Derived on write; recomputed from the subjects on read.
    #[serde(default)]
    pub total_score: i32,
    pub total_marks: u32,
    #[serde(default)]
    pub time_spent: u32,
    pub subjects: Vec<SubjectScoreRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TestRecordRecord {
    #[must_use]
    pub fn from_test(test: &TestRecord) -> Self {
        Self {
            id: test.id(),
            exam: test.exam(),
            date: test.date(),
            total_score: test.total_score(),
            total_marks: test.total_marks(),
            time_spent: test.time_spent_minutes(),
            subjects: test
                .subjects()
                .iter()
                .map(|s| SubjectScoreRecord {
                    subject: s.subject,
                    score: s.score,
                    attempted: s.attempted,
                    correct: s.correct,
                    incorrect: s.incorrect(),
                    topics: s.topics.clone(),
                })
                .collect(),
            notes: test.notes().map(str::to_owned),
        }
    }

    /// # Errors
    ///
    /// Returns `TestRecordError` if the breakdown violates the exam's mark scheme.
    pub fn into_test(self) -> Result<TestRecord, TestRecordError> {
        let subjects = self
            .subjects
            .into_iter()
            .map(|s| {
                SubjectScore::new(s.subject, s.score, s.attempted, s.correct).with_topics(s.topics)
            })
            .collect();
        TestRecord::from_persisted(
            self.id,
            self.exam,
            self.date,
            self.total_marks,
            self.time_spent,
            subjects,
            self.notes,
        )
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// User settings; every field falls back to its default when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRecord {
    pub exam: ExamType,
    pub active_subject: Subject,
    pub min_study_hours: f64,
    pub min_questions: u32,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl SettingsRecord {
    #[must_use]
    pub fn from_settings(settings: &AppSettings) -> Self {
        let streak = settings.streak();
        Self {
            exam: settings.exam(),
            active_subject: settings.active_subject(),
            min_study_hours: streak.min_study_hours(),
            min_questions: streak.min_questions(),
        }
    }

    /// # Errors
    ///
    /// Returns `study_core::Error` if the thresholds are invalid or the active
    /// subject does not belong to the exam.
    pub fn into_settings(self) -> Result<AppSettings, study_core::Error> {
        let streak = StreakSettings::new(self.min_study_hours, self.min_questions)?;
        Ok(AppSettings::new(self.exam, self.active_subject, streak)?)
    }
}

//
// ─── STREAK ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakDayRecord {
    pub day: LogicalDay,
    pub qualified: bool,
    #[serde(default)]
    pub streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreakRecord {
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_streak_day: Option<LogicalDay>,
    pub history: Vec<StreakDayRecord>,
}

impl StreakRecord {
    #[must_use]
    pub fn from_state(state: &StreakState) -> Self {
        Self {
            current_streak: state.current(),
            longest_streak: state.longest(),
            last_streak_day: state.last_streak_day(),
            history: state
                .history()
                .iter()
                .map(|e| StreakDayRecord {
                    day: e.day,
                    qualified: e.qualified,
                    streak: e.streak,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn into_state(self) -> StreakState {
        StreakState::from_persisted(
            self.current_streak,
            self.longest_streak,
            self.last_streak_day,
            self.history
                .into_iter()
                .map(|e| StreakDay {
                    day: e.day,
                    qualified: e.qualified,
                    streak: e.streak,
                })
                .collect(),
        )
    }
}

//
// ─── TIMER ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_title: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub accumulated_secs: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_since: Option<DateTime<Utc>>,
}

impl TimerRecord {
    #[must_use]
    pub fn from_timer(timer: &StudyTimer) -> Self {
        let (goal_task_id, goal_title) = goal_parts(timer.goal());
        Self {
            subject: timer.subject(),
            goal_task_id,
            goal_title,
            started_at: timer.started_at(),
            accumulated_secs: timer.accumulated_secs(),
            running_since: timer.running_since(),
        }
    }

    /// # Errors
    ///
    /// Returns `TimerError::Inconsistent` if the stored timing is impossible.
    pub fn into_timer(self) -> Result<StudyTimer, TimerError> {
        StudyTimer::from_persisted(
            self.subject,
            goal_from_parts(self.goal_task_id, self.goal_title),
            self.started_at,
            self.accumulated_secs,
            self.running_since,
        )
    }
}
