use storage::Snapshots;
use storage::repository::StorageError;
use study_core::day::LogicalDay;
use study_core::model::{AppSettings, QuestionGoal, StudySession, Task, TestRecord};
use study_core::report::{DailyReport, ReportInput, WeeklyReport};

use crate::Clock;

/// Builds daily and weekly reports from the stored collections.
#[derive(Clone)]
pub struct ReportService {
    clock: Clock,
    snapshots: Snapshots,
}

impl ReportService {
    #[must_use]
    pub fn new(clock: Clock, snapshots: Snapshots) -> Self {
        Self { clock, snapshots }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if loading fails.
    pub async fn daily(&self, day: LogicalDay) -> Result<DailyReport, StorageError> {
        let data = self.load().await?;
        Ok(DailyReport::build(&data.input(self.clock), day))
    }

    /// Report for the Monday-to-Sunday week containing `day`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading fails.
    pub async fn weekly(&self, day: LogicalDay) -> Result<WeeklyReport, StorageError> {
        let data = self.load().await?;
        Ok(WeeklyReport::build(&data.input(self.clock), day))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if loading fails.
    pub async fn today(&self) -> Result<DailyReport, StorageError> {
        self.daily(self.clock.today()).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if loading fails.
    pub async fn this_week(&self) -> Result<WeeklyReport, StorageError> {
        self.weekly(self.clock.today()).await
    }

    async fn load(&self) -> Result<Loaded, StorageError> {
        Ok(Loaded {
            settings: self.snapshots.load_settings().await?,
            goal: self.snapshots.load_goal().await?,
            sessions: self.snapshots.load_sessions().await?,
            tasks: self.snapshots.load_tasks().await?,
            tests: self.snapshots.load_tests().await?,
        })
    }
}

struct Loaded {
    settings: AppSettings,
    goal: QuestionGoal,
    sessions: Vec<StudySession>,
    tasks: Vec<Task>,
    tests: Vec<TestRecord>,
}

impl Loaded {
    fn input(&self, clock: Clock) -> ReportInput<'_> {
        ReportInput {
            exam: self.settings.exam().config(),
            goal: self.goal,
            offset: clock.offset(),
            sessions: &self.sessions,
            tasks: &self.tasks,
            tests: &self.tests,
        }
    }
}
