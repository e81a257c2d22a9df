use storage::{SnapshotBatch, Snapshots};
use study_core::exam::ExamType;
use study_core::model::{AppSettings, QuestionGoal, StreakSettings, Subject};
use study_core::state::{ExamMigration, StudyState};
use tracing::{info, warn};

use crate::error::SettingsServiceError;
use crate::streak_service::StreakService;

/// Reads and updates user settings, including the exam switch.
#[derive(Clone)]
pub struct SettingsService {
    snapshots: Snapshots,
    streak: StreakService,
}

impl SettingsService {
    #[must_use]
    pub fn new(snapshots: Snapshots, streak: StreakService) -> Self {
        Self { snapshots, streak }
    }

    /// # Errors
    ///
    /// Returns `SettingsServiceError::Storage` if loading fails.
    pub async fn load(&self) -> Result<AppSettings, SettingsServiceError> {
        Ok(self.snapshots.load_settings().await?)
    }

    /// Change the streak thresholds and re-evaluate today under them.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError::StreakSettings` for impossible thresholds.
    pub async fn set_streak_settings(
        &self,
        min_study_hours: f64,
        min_questions: u32,
    ) -> Result<AppSettings, SettingsServiceError> {
        let streak = StreakSettings::new(min_study_hours, min_questions)?;
        let settings = self.snapshots.load_settings().await?.with_streak(streak);
        self.snapshots.save_settings(&settings).await?;
        if let Err(err) = self.streak.refresh().await {
            warn!(error = %err, "streak settings saved but streak refresh failed");
        }
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns `SettingsServiceError::Storage` if persistence fails.
    pub async fn set_goal(&self, daily: u32) -> Result<QuestionGoal, SettingsServiceError> {
        let goal = QuestionGoal::new(daily);
        self.snapshots.save_goal(goal).await?;
        Ok(goal)
    }

    /// # Errors
    ///
    /// Returns `SettingsServiceError::Storage` if loading fails.
    pub async fn goal(&self) -> Result<QuestionGoal, SettingsServiceError> {
        Ok(self.snapshots.load_goal().await?)
    }

    /// # Errors
    ///
    /// Returns `SettingsServiceError::Settings` if the exam does not allow `subject`.
    pub async fn set_active_subject(
        &self,
        subject: Subject,
    ) -> Result<AppSettings, SettingsServiceError> {
        let settings = self
            .snapshots
            .load_settings()
            .await?
            .with_active_subject(subject)?;
        self.snapshots.save_settings(&settings).await?;
        Ok(settings)
    }

    /// Switch to `target`, discarding every record the new exam cannot hold.
    ///
    /// Sessions and tasks for subjects outside the new exam are dropped, all
    /// test records are dropped, and an active timer for a dropped subject is
    /// cancelled. Switching to the current exam changes nothing. Every slot is
    /// written in one batch, so a failed switch leaves all of them untouched.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError::Storage` if loading or persisting fails.
    pub async fn switch_exam(&self, target: ExamType) -> Result<ExamMigration, SettingsServiceError> {
        let settings = self.snapshots.load_settings().await?;
        let state = StudyState {
            exam: settings.exam(),
            active_subject: settings.active_subject(),
            sessions: self.snapshots.load_sessions().await?,
            tasks: self.snapshots.load_tasks().await?,
            tests: self.snapshots.load_tests().await?,
        };

        let (next, migration) = state.switch_exam(target);
        if migration.is_noop() {
            return Ok(migration);
        }

        let stale_timer = self
            .snapshots
            .load_timer()
            .await?
            .filter(|timer| !target.config().allows(timer.subject()));

        let mut batch = SnapshotBatch::new();
        batch.sessions(&next.sessions)?;
        batch.tasks(&next.tasks)?;
        batch.tests(&next.tests)?;
        batch.settings(&settings.for_exam(next.exam))?;
        if let Some(timer) = &stale_timer {
            warn!(subject = %timer.subject(), "cancelling timer for a subject outside the new exam");
            batch.timer(None)?;
        }
        self.snapshots.commit(batch).await?;

        info!(
            from = %migration.from,
            to = %migration.to,
            sessions_discarded = migration.sessions_discarded,
            tasks_discarded = migration.tasks_discarded,
            tests_discarded = migration.tests_discarded,
            "exam switched"
        );

        if let Err(err) = self.streak.refresh_with(&next.sessions).await {
            warn!(error = %err, "exam switched but streak refresh failed");
        }
        Ok(migration)
    }
}
