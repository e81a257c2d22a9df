//! Typed load/save of whole collections over a [`KeyValueStore`].
//!
//! Loading never fails on bad data: a slot that is missing or unparseable
//! yields the empty/default value, and individual records that fail domain
//! validation are dropped. Both cases are logged. Only backend failures
//! surface as `StorageError`.

use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use study_core::model::{AppSettings, QuestionGoal, StreakState, StudySession, Task, TestRecord};
use study_core::timer::StudyTimer;

use crate::records::{
    SessionRecord, SettingsRecord, StreakRecord, TaskRecord, TestRecordRecord, TimerRecord,
};
use crate::repository::{KeyValueStore, Slot, SlotWrite, StorageError};

fn encode<R: Serialize + ?Sized>(doc: &R) -> Result<String, StorageError> {
    serde_json::to_string(doc).map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Slot writes staged in memory and applied together by [`Snapshots::commit`].
#[derive(Debug, Default)]
pub struct SnapshotBatch {
    writes: Vec<SlotWrite>,
}

impl SnapshotBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the sessions cannot be encoded.
    pub fn sessions(&mut self, sessions: &[StudySession]) -> Result<(), StorageError> {
        let records: Vec<_> = sessions.iter().map(SessionRecord::from_session).collect();
        self.stage(Slot::Sessions, &records)
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the tasks cannot be encoded.
    pub fn tasks(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let records: Vec<_> = tasks.iter().map(TaskRecord::from_task).collect();
        self.stage(Slot::Tasks, &records)
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the test records cannot be encoded.
    pub fn tests(&mut self, tests: &[TestRecord]) -> Result<(), StorageError> {
        let records: Vec<_> = tests.iter().map(TestRecordRecord::from_test).collect();
        self.stage(Slot::Tests, &records)
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the settings cannot be encoded.
    pub fn settings(&mut self, settings: &AppSettings) -> Result<(), StorageError> {
        self.stage(Slot::Settings, &SettingsRecord::from_settings(settings))
    }

    /// Stage the timer; `None` clears the slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the timer cannot be encoded.
    pub fn timer(&mut self, timer: Option<&StudyTimer>) -> Result<(), StorageError> {
        match timer {
            Some(timer) => self.stage(Slot::Timer, &TimerRecord::from_timer(timer)),
            None => {
                self.writes.push(SlotWrite::Remove(Slot::Timer));
                Ok(())
            }
        }
    }

    fn stage<R: Serialize + ?Sized>(&mut self, slot: Slot, doc: &R) -> Result<(), StorageError> {
        self.writes.push(SlotWrite::Set(slot, encode(doc)?));
        Ok(())
    }
}

#[derive(Clone)]
pub struct Snapshots {
    kv: Arc<dyn KeyValueStore>,
}

impl Snapshots {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Raw JSON of a slot, or `None` if missing or unparseable.
    async fn load_value(&self, slot: Slot) -> Result<Option<Value>, StorageError> {
        let Some(raw) = self.kv.get(slot).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(slot = %slot, error = %err, "discarding unparseable snapshot");
                Ok(None)
            }
        }
    }

    async fn load_doc<R: DeserializeOwned>(&self, slot: Slot) -> Result<Option<R>, StorageError> {
        let Some(value) = self.load_value(slot).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(doc) => Ok(Some(doc)),
            Err(err) => {
                warn!(slot = %slot, error = %err, "discarding malformed snapshot");
                Ok(None)
            }
        }
    }

    async fn load_list<R, T, E>(
        &self,
        slot: Slot,
        convert: impl Fn(R) -> Result<T, E>,
    ) -> Result<Vec<T>, StorageError>
    where
        R: DeserializeOwned,
        E: Display,
    {
        let items = match self.load_value(slot).await? {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                warn!(slot = %slot, "discarding snapshot that is not a list");
                return Ok(Vec::new());
            }
        };

        let total = items.len();
        let mut loaded = Vec::with_capacity(total);
        for (index, item) in items.into_iter().enumerate() {
            let record = match serde_json::from_value::<R>(item) {
                Ok(record) => record,
                Err(err) => {
                    warn!(slot = %slot, index, error = %err, "skipping malformed record");
                    continue;
                }
            };
            match convert(record) {
                Ok(value) => loaded.push(value),
                Err(err) => warn!(slot = %slot, index, error = %err, "skipping invalid record"),
            }
        }
        debug!(slot = %slot, loaded = loaded.len(), total, "loaded snapshot");
        Ok(loaded)
    }

    async fn save_doc<R: Serialize + ?Sized>(&self, slot: Slot, doc: &R) -> Result<(), StorageError> {
        self.kv.set(slot, &encode(doc)?).await
    }

    /// Apply every write staged in `batch` as one unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the batch; no slot is changed then.
    pub async fn commit(&self, batch: SnapshotBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!(writes = batch.writes.len(), "committing snapshot batch");
        self.kv.write_batch(&batch.writes).await
    }

    // ─── Collections ──────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_sessions(&self) -> Result<Vec<StudySession>, StorageError> {
        self.load_list(Slot::Sessions, SessionRecord::into_session).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the sessions cannot be serialized or written.
    pub async fn save_sessions(&self, sessions: &[StudySession]) -> Result<(), StorageError> {
        let records: Vec<_> = sessions.iter().map(SessionRecord::from_session).collect();
        self.save_doc(Slot::Sessions, &records).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        self.load_list(Slot::Tasks, TaskRecord::into_task).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the tasks cannot be serialized or written.
    pub async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let records: Vec<_> = tasks.iter().map(TaskRecord::from_task).collect();
        self.save_doc(Slot::Tasks, &records).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_tests(&self) -> Result<Vec<TestRecord>, StorageError> {
        self.load_list(Slot::Tests, TestRecordRecord::into_test).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the test records cannot be serialized or written.
    pub async fn save_tests(&self, tests: &[TestRecord]) -> Result<(), StorageError> {
        let records: Vec<_> = tests.iter().map(TestRecordRecord::from_test).collect();
        self.save_doc(Slot::Tests, &records).await
    }

    // ─── Documents ────────────────────────────────────────────────────────────

    /// Stored settings, or the defaults if none are stored or they are invalid.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_settings(&self) -> Result<AppSettings, StorageError> {
        let Some(record) = self.load_doc::<SettingsRecord>(Slot::Settings).await? else {
            return Ok(AppSettings::default());
        };
        match record.into_settings() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!(error = %err, "stored settings are invalid; using defaults");
                Ok(AppSettings::default())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be serialized or written.
    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        self.save_doc(Slot::Settings, &SettingsRecord::from_settings(settings))
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_goal(&self) -> Result<QuestionGoal, StorageError> {
        Ok(self
            .load_doc::<u32>(Slot::Goal)
            .await?
            .map_or_else(QuestionGoal::default, QuestionGoal::new))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the goal cannot be written.
    pub async fn save_goal(&self, goal: QuestionGoal) -> Result<(), StorageError> {
        self.save_doc(Slot::Goal, &goal.daily()).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_streak(&self) -> Result<StreakState, StorageError> {
        Ok(self
            .load_doc::<StreakRecord>(Slot::Streak)
            .await?
            .map(StreakRecord::into_state)
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the streak cannot be serialized or written.
    pub async fn save_streak(&self, state: &StreakState) -> Result<(), StorageError> {
        self.save_doc(Slot::Streak, &StreakRecord::from_state(state))
            .await
    }

    /// The persisted timer, if one is running or paused.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_timer(&self) -> Result<Option<StudyTimer>, StorageError> {
        let Some(record) = self.load_doc::<TimerRecord>(Slot::Timer).await? else {
            return Ok(None);
        };
        match record.into_timer() {
            Ok(timer) => Ok(Some(timer)),
            Err(err) => {
                warn!(error = %err, "discarding invalid timer state");
                Ok(None)
            }
        }
    }

    /// Persist the timer; `None` clears the slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the timer cannot be serialized or written.
    pub async fn save_timer(&self, timer: Option<&StudyTimer>) -> Result<(), StorageError> {
        match timer {
            Some(timer) => {
                self.save_doc(Slot::Timer, &TimerRecord::from_timer(timer))
                    .await
            }
            None => self.kv.remove(Slot::Timer).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use chrono::{Duration, NaiveDate};
    use study_core::day::LogicalDay;
    use study_core::exam::ExamType;
    use study_core::model::{
        GoalRef, SessionDraft, SessionId, StreakDay, StreakSettings, Subject, SubjectScore,
        TaskId, TestRecordDraft, TestRecordId,
    };
    use study_core::time::fixed_now;

    fn snapshots() -> (Arc<InMemoryStore>, Snapshots) {
        let store = Arc::new(InMemoryStore::new());
        let snaps = Snapshots::new(store.clone());
        (store, snaps)
    }

    fn session(mins: i64, goal: Option<GoalRef>) -> StudySession {
        let start = fixed_now();
        let mut draft = SessionDraft::new(Subject::Physics, start, start + Duration::minutes(mins))
            .with_questions(25)
            .with_notes("  kinematics  ");
        draft.goal = goal;
        draft
            .validate(ExamType::Jee.config())
            .unwrap()
            .assign_id(SessionId::generate())
    }

    #[tokio::test]
    async fn missing_slots_load_as_empty_or_default() {
        let (_, snaps) = snapshots();
        assert!(snaps.load_sessions().await.unwrap().is_empty());
        assert!(snaps.load_tasks().await.unwrap().is_empty());
        assert!(snaps.load_tests().await.unwrap().is_empty());
        assert_eq!(snaps.load_settings().await.unwrap(), AppSettings::default());
        assert_eq!(snaps.load_goal().await.unwrap(), QuestionGoal::default());
        assert_eq!(snaps.load_streak().await.unwrap(), StreakState::default());
        assert_eq!(snaps.load_timer().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sessions_round_trip() {
        let (_, snaps) = snapshots();
        let goal = GoalRef::new(TaskId::generate(), "Kinematics sheet");
        let sessions = vec![session(45, Some(goal)), session(90, None)];
        snaps.save_sessions(&sessions).await.unwrap();
        assert_eq!(snaps.load_sessions().await.unwrap(), sessions);
    }

    #[tokio::test]
    async fn test_records_round_trip() {
        let (_, snaps) = snapshots();
        let test = TestRecordDraft {
            date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            time_spent_minutes: 170,
            subjects: vec![
                SubjectScore::new(Subject::Physics, -4, 10, 2)
                    .with_topics(vec!["optics".into()]),
                SubjectScore::new(Subject::Chemistry, 64, 20, 17),
            ],
            notes: Some("silly errors".into()),
        }
        .validate(TestRecordId::generate(), ExamType::Jee.config())
        .unwrap();
        snaps.save_tests(std::slice::from_ref(&test)).await.unwrap();
        assert_eq!(snaps.load_tests().await.unwrap(), vec![test]);
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_empty() {
        let (store, snaps) = snapshots();
        store.set(Slot::Sessions, "{not json").await.unwrap();
        store.set(Slot::Tasks, r#"{"id": 1}"#).await.unwrap();
        store.set(Slot::Settings, "[]").await.unwrap();
        assert!(snaps.load_sessions().await.unwrap().is_empty());
        assert!(snaps.load_tasks().await.unwrap().is_empty());
        assert_eq!(snaps.load_settings().await.unwrap(), AppSettings::default());
    }

    #[tokio::test]
    async fn invalid_records_are_skipped_individually() {
        let (store, snaps) = snapshots();
        let good = session(30, None);
        let mut bad = serde_json::to_value(SessionRecord::from_session(&good)).unwrap();
        bad["duration"] = serde_json::json!(5);
        let list = serde_json::json!([
            SessionRecord::from_session(&good),
            bad,
            {"unexpected": true}
        ]);
        store.set(Slot::Sessions, &list.to_string()).await.unwrap();

        assert_eq!(snaps.load_sessions().await.unwrap(), vec![good]);
    }

    #[tokio::test]
    async fn settings_goal_streak_and_timer_round_trip() {
        let (store, snaps) = snapshots();

        let settings = AppSettings::new(
            ExamType::Neet,
            Subject::Zoology,
            StreakSettings::new(6.0, 45).unwrap(),
        )
        .unwrap();
        snaps.save_settings(&settings).await.unwrap();
        assert_eq!(snaps.load_settings().await.unwrap(), settings);

        snaps.save_goal(QuestionGoal::new(150)).await.unwrap();
        assert_eq!(snaps.load_goal().await.unwrap().daily(), 150);

        let day = LogicalDay::from_date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        let streak = StreakState::from_persisted(
            1,
            4,
            Some(day),
            vec![StreakDay {
                day,
                qualified: true,
                streak: 1,
            }],
        );
        snaps.save_streak(&streak).await.unwrap();
        assert_eq!(snaps.load_streak().await.unwrap(), streak);

        let timer = StudyTimer::start(Subject::Botany, None, fixed_now());
        snaps.save_timer(Some(&timer)).await.unwrap();
        assert_eq!(snaps.load_timer().await.unwrap(), Some(timer));
        snaps.save_timer(None).await.unwrap();
        assert_eq!(store.get(Slot::Timer).await.unwrap(), None);
    }

    #[tokio::test]
    async fn out_of_range_timer_loads_as_none() {
        let (store, snaps) = snapshots();
        store
            .set(
                Slot::Timer,
                r#"{"subject":"physics","startedAt":"2023-11-14T20:00:00Z","accumulatedSecs":9000000000000000000}"#,
            )
            .await
            .unwrap();
        assert_eq!(snaps.load_timer().await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_commits_several_slots_together() {
        let (store, snaps) = snapshots();
        let timer = StudyTimer::start(Subject::Physics, None, fixed_now());
        snaps.save_timer(Some(&timer)).await.unwrap();

        let sessions = vec![session(40, None)];
        let settings = AppSettings::default().for_exam(ExamType::Neet);
        let mut batch = SnapshotBatch::new();
        batch.sessions(&sessions).unwrap();
        batch.tasks(&[]).unwrap();
        batch.settings(&settings).unwrap();
        batch.timer(None).unwrap();
        snaps.commit(batch).await.unwrap();

        assert_eq!(snaps.load_sessions().await.unwrap(), sessions);
        assert!(snaps.load_tasks().await.unwrap().is_empty());
        assert_eq!(snaps.load_settings().await.unwrap().exam(), ExamType::Neet);
        assert_eq!(store.get(Slot::Timer).await.unwrap(), None);
    }
}
