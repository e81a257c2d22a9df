use thiserror::Error;

use crate::model::{AppSettingsError, SessionError, StreakSettingsError, TaskError, TestRecordError};
use crate::timer::TimerError;

/// Any domain validation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    TestRecord(#[from] TestRecordError),
    #[error(transparent)]
    Settings(#[from] AppSettingsError),
    #[error(transparent)]
    StreakSettings(#[from] StreakSettingsError),
    #[error(transparent)]
    Timer(#[from] TimerError),
}
