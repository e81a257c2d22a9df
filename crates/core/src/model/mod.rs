mod app_settings;
mod ids;
mod session;
mod streak;
mod subject;
mod task;
mod test_record;

pub use ids::{ParseIdError, SessionId, TaskId, TestRecordId};
pub use subject::{ParseSubjectError, Subject};

pub use app_settings::{AppSettings, AppSettingsError, QuestionGoal};
pub use session::{
    GoalRef, SessionDraft, SessionError, StudySession, ValidatedSession, session_duration,
};
pub use streak::{StreakDay, StreakSettings, StreakSettingsError, StreakState};
pub use task::{Task, TaskError};
pub use test_record::{SubjectScore, TestRecord, TestRecordDraft, TestRecordError};
