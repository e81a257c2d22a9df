//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{
    AppSettingsError, SessionId, StreakSettingsError, Subject, TaskError, TaskId, TestRecordError,
    TestRecordId,
};
use study_core::timer::TimerError;

/// Errors emitted by `SessionLogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionLogError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error(transparent)]
    Session(#[from] study_core::model::SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TimerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TimerServiceError {
    #[error("a timer is already active")]
    AlreadyActive,
    #[error("no timer is active")]
    NoActiveTimer,
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("subject {0} is not available under the current exam")]
    SubjectNotInExam(Subject),
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    Session(#[from] SessionLogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TaskService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskServiceError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TestRecordService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRecordServiceError {
    #[error("test record {0} not found")]
    NotFound(TestRecordId),
    #[error(transparent)]
    TestRecord(#[from] TestRecordError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Settings(#[from] AppSettingsError),
    #[error(transparent)]
    StreakSettings(#[from] StreakSettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
