#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod report_service;
pub mod session_log_service;
pub mod settings_service;
pub mod streak_service;
pub mod task_service;
pub mod test_record_service;
pub mod timer_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, SessionLogError, SettingsServiceError, TaskServiceError,
    TestRecordServiceError, TimerServiceError,
};
pub use report_service::ReportService;
pub use session_log_service::{SessionEdit, SessionLogService};
pub use settings_service::SettingsService;
pub use streak_service::StreakService;
pub use task_service::TaskService;
pub use test_record_service::TestRecordService;
pub use timer_service::{TimerService, TimerStatus};
