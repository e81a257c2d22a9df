use chrono::{DateTime, Utc};
use storage::{SnapshotBatch, Snapshots};
use study_core::aggregate::filter_by_logical_range;
use study_core::day::LogicalRange;
use study_core::model::{SessionDraft, SessionError, SessionId, StudySession};
use tracing::{debug, warn};

use crate::Clock;
use crate::error::SessionLogError;
use crate::streak_service::StreakService;

/// Changes to one session, validated together and committed in one write.
/// `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEdit {
    pub ended_at: Option<DateTime<Utc>>,
    pub questions: Option<i64>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

impl SessionEdit {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ended_at.is_none() && self.questions.is_none() && self.notes.is_none()
    }

    fn apply(self, session: &StudySession) -> Result<StudySession, SessionError> {
        let mut next = session.clone();
        if let Some(ended_at) = self.ended_at {
            next = next.with_end(ended_at)?;
        }
        if let Some(questions) = self.questions {
            next = next.with_questions(questions)?;
        }
        if let Some(notes) = self.notes {
            next = next.with_notes(notes);
        }
        Ok(next)
    }
}

/// Owns the session collection. Every mutation rewrites the whole collection
/// and re-evaluates the streak.
#[derive(Clone)]
pub struct SessionLogService {
    clock: Clock,
    snapshots: Snapshots,
    streak: StreakService,
}

impl SessionLogService {
    #[must_use]
    pub fn new(clock: Clock, snapshots: Snapshots, streak: StreakService) -> Self {
        Self {
            clock,
            snapshots,
            streak,
        }
    }

    /// Record the session produced by a stopped timer and clear the timer
    /// slot in the same write.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::Session` for validation failures.
    /// Returns `SessionLogError::Storage` if persistence fails; the timer is
    /// then still stored.
    pub async fn record_timer(&self, draft: SessionDraft) -> Result<StudySession, SessionLogError> {
        let mut batch = SnapshotBatch::new();
        batch.timer(None)?;
        self.insert(draft, "timer", batch).await
    }

    /// Record a manually entered session.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::Session` for validation failures.
    /// Returns `SessionLogError::Storage` if persistence fails.
    pub async fn add_manual(&self, draft: SessionDraft) -> Result<StudySession, SessionLogError> {
        self.insert(draft, "manual", SnapshotBatch::new()).await
    }

    async fn insert(
        &self,
        draft: SessionDraft,
        source: &'static str,
        batch: SnapshotBatch,
    ) -> Result<StudySession, SessionLogError> {
        let settings = self.snapshots.load_settings().await?;
        let session = draft
            .validate(settings.exam().config())?
            .assign_id(SessionId::generate());

        let mut sessions = self.snapshots.load_sessions().await?;
        sessions.push(session.clone());
        self.commit(&sessions, batch).await?;

        debug!(
            id = %session.id(),
            subject = %session.subject(),
            duration_secs = session.duration_secs(),
            source,
            "session recorded"
        );
        Ok(session)
    }

    /// Apply every change in `edit` to one session. If any change is invalid
    /// nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::NotFound` for unknown ids and
    /// `SessionLogError::Session` if the edited session is invalid.
    pub async fn edit(
        &self,
        id: SessionId,
        edit: SessionEdit,
    ) -> Result<StudySession, SessionLogError> {
        self.update(id, |s| edit.apply(s)).await
    }

    /// Move the end of a session; the duration is recomputed.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::NotFound` for unknown ids and
    /// `SessionLogError::Session` if the new range is invalid.
    pub async fn edit_end_time(
        &self,
        id: SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<StudySession, SessionLogError> {
        self.update(id, |s| s.with_end(ended_at)).await
    }

    /// # Errors
    ///
    /// Returns `SessionLogError::NotFound` for unknown ids and
    /// `SessionLogError::Session` for negative counts.
    pub async fn edit_questions(
        &self,
        id: SessionId,
        questions: i64,
    ) -> Result<StudySession, SessionLogError> {
        self.update(id, |s| s.with_questions(questions)).await
    }

    /// # Errors
    ///
    /// Returns `SessionLogError::NotFound` for unknown ids.
    pub async fn edit_notes(
        &self,
        id: SessionId,
        notes: Option<String>,
    ) -> Result<StudySession, SessionLogError> {
        self.update(id, |s| Ok(s.with_notes(notes))).await
    }

    async fn update<F>(&self, id: SessionId, edit: F) -> Result<StudySession, SessionLogError>
    where
        F: FnOnce(&StudySession) -> Result<StudySession, SessionError>,
    {
        let mut sessions = self.snapshots.load_sessions().await?;
        let slot = sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(SessionLogError::NotFound(id))?;
        let updated = edit(slot)?;
        *slot = updated.clone();
        self.commit(&sessions, SnapshotBatch::new()).await?;

        debug!(id = %id, "session edited");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `SessionLogError::NotFound` for unknown ids.
    pub async fn delete(&self, id: SessionId) -> Result<(), SessionLogError> {
        let mut sessions = self.snapshots.load_sessions().await?;
        let before = sessions.len();
        sessions.retain(|s| s.id() != id);
        if sessions.len() == before {
            return Err(SessionLogError::NotFound(id));
        }
        self.commit(&sessions, SnapshotBatch::new()).await?;

        debug!(id = %id, "session deleted");
        Ok(())
    }

    /// All sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::Storage` if loading fails.
    pub async fn list(&self) -> Result<Vec<StudySession>, SessionLogError> {
        let mut sessions = self.snapshots.load_sessions().await?;
        sessions.sort_by_key(StudySession::started_at);
        Ok(sessions)
    }

    /// Sessions whose logical day falls in `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::Storage` if loading fails.
    pub async fn list_in_range(
        &self,
        range: &LogicalRange,
    ) -> Result<Vec<StudySession>, SessionLogError> {
        let sessions = self.list().await?;
        Ok(filter_by_logical_range(&sessions, range, self.clock.offset())
            .into_iter()
            .cloned()
            .collect())
    }

    /// Store `sessions` together with anything already staged in `batch`.
    /// Once that write lands the mutation has succeeded; a streak refresh
    /// failure afterwards is only logged and retried on the next refresh.
    async fn commit(
        &self,
        sessions: &[StudySession],
        mut batch: SnapshotBatch,
    ) -> Result<(), SessionLogError> {
        batch.sessions(sessions)?;
        self.snapshots.commit(batch).await?;
        if let Err(err) = self.streak.refresh_with(sessions).await {
            warn!(error = %err, "sessions saved but streak refresh failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use storage::repository::InMemoryStore;
    use study_core::model::Subject;
    use study_core::time::fixed_clock;

    fn service() -> SessionLogService {
        let clock = fixed_clock();
        let snapshots = Snapshots::new(Arc::new(InMemoryStore::new()));
        let streak = StreakService::new(clock, snapshots.clone());
        SessionLogService::new(clock, snapshots, streak)
    }

    fn draft(subject: Subject, mins: i64) -> SessionDraft {
        let start = fixed_clock().now() - Duration::hours(2);
        SessionDraft::new(subject, start, start + Duration::minutes(mins))
    }

    #[tokio::test]
    async fn invalid_edit_leaves_collection_unchanged() {
        let service = service();
        let session = service
            .add_manual(draft(Subject::Physics, 30).with_questions(10))
            .await
            .unwrap();

        let err = service
            .edit_end_time(session.id(), session.started_at())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionLogError::Session(SessionError::InvalidTimeRange)
        ));
        assert_eq!(service.list().await.unwrap(), vec![session]);
    }

    #[tokio::test]
    async fn foreign_subject_is_rejected() {
        let service = service();
        let err = service
            .add_manual(draft(Subject::Zoology, 30))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionLogError::Session(SessionError::SubjectNotInExam(Subject::Zoology))
        ));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edits_recompute_duration_and_delete_removes() {
        let service = service();
        let session = service.add_manual(draft(Subject::Chemistry, 30)).await.unwrap();

        let longer = service
            .edit_end_time(session.id(), session.started_at() + Duration::minutes(75))
            .await
            .unwrap();
        assert_eq!(longer.duration_secs(), 75 * 60);

        let noted = service
            .edit_notes(session.id(), Some("   ".into()))
            .await
            .unwrap();
        assert_eq!(noted.notes(), None);

        assert!(matches!(
            service.edit_questions(session.id(), -1).await,
            Err(SessionLogError::Session(SessionError::NegativeQuestions(-1)))
        ));

        service.delete(session.id()).await.unwrap();
        assert!(matches!(
            service.delete(session.id()).await,
            Err(SessionLogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn combined_edit_is_all_or_nothing() {
        let service = service();
        let session = service
            .add_manual(draft(Subject::Physics, 30).with_questions(10))
            .await
            .unwrap();

        let rejected = SessionEdit {
            ended_at: Some(session.started_at() + Duration::minutes(90)),
            questions: Some(-3),
            notes: Some(Some("wave optics".into())),
        };
        assert!(matches!(
            service.edit(session.id(), rejected).await,
            Err(SessionLogError::Session(SessionError::NegativeQuestions(-3)))
        ));
        assert_eq!(service.list().await.unwrap(), vec![session.clone()]);

        let accepted = SessionEdit {
            ended_at: Some(session.started_at() + Duration::minutes(90)),
            questions: Some(42),
            notes: Some(Some("wave optics".into())),
        };
        let edited = service.edit(session.id(), accepted).await.unwrap();
        assert_eq!(edited.duration_secs(), 90 * 60);
        assert_eq!(edited.questions(), 42);
        assert_eq!(edited.notes(), Some("wave optics"));
        assert_eq!(service.list().await.unwrap(), vec![edited]);
    }
}
