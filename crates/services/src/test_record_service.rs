use storage::Snapshots;
use study_core::aggregate::filter_by_logical_range;
use study_core::day::LogicalRange;
use study_core::model::{TestRecord, TestRecordDraft, TestRecordId};
use tracing::debug;

use crate::Clock;
use crate::error::TestRecordServiceError;

/// Records mock-test results against the active exam's mark scheme.
#[derive(Clone)]
pub struct TestRecordService {
    clock: Clock,
    snapshots: Snapshots,
}

impl TestRecordService {
    #[must_use]
    pub fn new(clock: Clock, snapshots: Snapshots) -> Self {
        Self { clock, snapshots }
    }

    /// # Errors
    ///
    /// Returns `TestRecordServiceError::TestRecord` if the breakdown violates
    /// the exam's mark scheme.
    pub async fn add(&self, draft: TestRecordDraft) -> Result<TestRecord, TestRecordServiceError> {
        let exam = self.snapshots.load_settings().await?.exam();
        let record = draft.validate(TestRecordId::generate(), exam.config())?;

        let mut tests = self.snapshots.load_tests().await?;
        tests.push(record.clone());
        self.snapshots.save_tests(&tests).await?;
        debug!(
            id = %record.id(),
            exam = %record.exam(),
            score = record.total_score(),
            "test record added"
        );
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `TestRecordServiceError::NotFound` for unknown ids.
    pub async fn delete(&self, id: TestRecordId) -> Result<(), TestRecordServiceError> {
        let mut tests = self.snapshots.load_tests().await?;
        let before = tests.len();
        tests.retain(|t| t.id() != id);
        if tests.len() == before {
            return Err(TestRecordServiceError::NotFound(id));
        }
        self.snapshots.save_tests(&tests).await?;
        Ok(())
    }

    /// All records, oldest test date first.
    ///
    /// # Errors
    ///
    /// Returns `TestRecordServiceError::Storage` if loading fails.
    pub async fn list(&self) -> Result<Vec<TestRecord>, TestRecordServiceError> {
        let mut tests = self.snapshots.load_tests().await?;
        tests.sort_by_key(TestRecord::date);
        Ok(tests)
    }

    /// # Errors
    ///
    /// Returns `TestRecordServiceError::Storage` if loading fails.
    pub async fn list_in_range(
        &self,
        range: &LogicalRange,
    ) -> Result<Vec<TestRecord>, TestRecordServiceError> {
        let tests = self.list().await?;
        Ok(filter_by_logical_range(&tests, range, self.clock.offset())
            .into_iter()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use storage::repository::InMemoryStore;
    use study_core::day::LogicalDay;
    use study_core::model::{Subject, SubjectScore, TestRecordError};
    use study_core::time::fixed_clock;

    fn service() -> TestRecordService {
        TestRecordService::new(
            fixed_clock(),
            Snapshots::new(Arc::new(InMemoryStore::new())),
        )
    }

    fn draft(day: u32, subjects: Vec<SubjectScore>) -> TestRecordDraft {
        TestRecordDraft {
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            time_spent_minutes: 180,
            subjects,
            notes: None,
        }
    }

    #[tokio::test]
    async fn records_are_validated_against_active_exam() {
        let service = service();
        let err = service
            .add(draft(1, vec![SubjectScore::new(Subject::Physics, 101, 25, 25)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TestRecordServiceError::TestRecord(TestRecordError::ScoreExceedsMax { .. })
        ));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_in_range_uses_test_date() {
        let service = service();
        let early = service
            .add(draft(1, vec![SubjectScore::new(Subject::Physics, 60, 20, 16)]))
            .await
            .unwrap();
        let late = service
            .add(draft(9, vec![SubjectScore::new(Subject::Mathematics, 72, 22, 19)]))
            .await
            .unwrap();
        assert_eq!(late.total_marks(), 300);

        let first_week = LogicalRange::new(
            LogicalDay::from_date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
            LogicalDay::from_date(NaiveDate::from_ymd_opt(2024, 4, 7).unwrap()),
        );
        assert_eq!(service.list_in_range(&first_week).await.unwrap(), vec![early.clone()]);

        service.delete(early.id()).await.unwrap();
        assert_eq!(service.list().await.unwrap(), vec![late]);
    }
}
