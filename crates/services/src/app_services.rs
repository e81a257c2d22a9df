use std::sync::Arc;

use storage::Snapshots;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::report_service::ReportService;
use crate::session_log_service::SessionLogService;
use crate::settings_service::SettingsService;
use crate::streak_service::StreakService;
use crate::task_service::TaskService;
use crate::test_record_service::TestRecordService;
use crate::timer_service::TimerService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    sessions: Arc<SessionLogService>,
    timer: Arc<TimerService>,
    tasks: Arc<TaskService>,
    tests: Arc<TestRecordService>,
    reports: Arc<ReportService>,
    streak: Arc<StreakService>,
    settings: Arc<SettingsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and bring the streak up to date.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or the initial
    /// streak refresh fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let services = Self::from_storage(&storage, clock);
        services.streak.refresh().await?;
        Ok(services)
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let snapshots = Snapshots::new(Arc::clone(&storage.kv));
        let streak = StreakService::new(clock, snapshots.clone());
        let sessions = SessionLogService::new(clock, snapshots.clone(), streak.clone());
        let timer = TimerService::new(clock, snapshots.clone(), sessions.clone());
        let tasks = TaskService::new(clock, snapshots.clone());
        let tests = TestRecordService::new(clock, snapshots.clone());
        let reports = ReportService::new(clock, snapshots.clone());
        let settings = SettingsService::new(snapshots, streak.clone());

        Self {
            clock,
            sessions: Arc::new(sessions),
            timer: Arc::new(timer),
            tasks: Arc::new(tasks),
            tests: Arc::new(tests),
            reports: Arc::new(reports),
            streak: Arc::new(streak),
            settings: Arc::new(settings),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionLogService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn timer(&self) -> Arc<TimerService> {
        Arc::clone(&self.timer)
    }

    #[must_use]
    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.tasks)
    }

    #[must_use]
    pub fn tests(&self) -> Arc<TestRecordService> {
        Arc::clone(&self.tests)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.reports)
    }

    #[must_use]
    pub fn streak(&self) -> Arc<StreakService> {
        Arc::clone(&self.streak)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }
}
