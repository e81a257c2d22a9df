use storage::Snapshots;
use study_core::model::{Subject, Task, TaskId};
use tracing::debug;

use crate::Clock;
use crate::error::TaskServiceError;

/// Orchestrates the per-subject task lists.
#[derive(Clone)]
pub struct TaskService {
    clock: Clock,
    snapshots: Snapshots,
}

impl TaskService {
    #[must_use]
    pub fn new(clock: Clock, snapshots: Snapshots) -> Self {
        Self { clock, snapshots }
    }

    /// Create a task and persist it.
    ///
    /// # Errors
    ///
    /// Returns `TaskServiceError::Task` for validation failures.
    /// Returns `TaskServiceError::Storage` if persistence fails.
    pub async fn add(&self, title: &str, subject: Subject) -> Result<Task, TaskServiceError> {
        let exam = self.snapshots.load_settings().await?.exam();
        let task = Task::new(
            TaskId::generate(),
            title,
            subject,
            exam.config(),
            self.clock.now(),
        )?;

        let mut tasks = self.snapshots.load_tasks().await?;
        tasks.push(task.clone());
        self.snapshots.save_tasks(&tasks).await?;
        debug!(id = %task.id(), subject = %subject, "task added");
        Ok(task)
    }

    /// Flip the completion flag.
    ///
    /// # Errors
    ///
    /// Returns `TaskServiceError::NotFound` for unknown ids.
    pub async fn toggle(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        self.update(id, |t| Ok(t.toggled())).await
    }

    /// # Errors
    ///
    /// Returns `TaskServiceError::NotFound` for unknown ids and
    /// `TaskServiceError::Task` for a blank title.
    pub async fn rename(&self, id: TaskId, title: &str) -> Result<Task, TaskServiceError> {
        self.update(id, |t| t.renamed(title)).await
    }

    async fn update<F>(&self, id: TaskId, edit: F) -> Result<Task, TaskServiceError>
    where
        F: FnOnce(&Task) -> Result<Task, study_core::model::TaskError>,
    {
        let mut tasks = self.snapshots.load_tasks().await?;
        let slot = tasks
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(TaskServiceError::NotFound(id))?;
        let updated = edit(slot)?;
        *slot = updated.clone();
        self.snapshots.save_tasks(&tasks).await?;
        Ok(updated)
    }

    /// Delete a task. Sessions keep their goal snapshot.
    ///
    /// # Errors
    ///
    /// Returns `TaskServiceError::NotFound` for unknown ids.
    pub async fn delete(&self, id: TaskId) -> Result<(), TaskServiceError> {
        let mut tasks = self.snapshots.load_tasks().await?;
        let before = tasks.len();
        tasks.retain(|t| t.id() != id);
        if tasks.len() == before {
            return Err(TaskServiceError::NotFound(id));
        }
        self.snapshots.save_tasks(&tasks).await?;
        debug!(id = %id, "task deleted");
        Ok(())
    }

    /// All tasks, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `TaskServiceError::Storage` if loading fails.
    pub async fn list(&self) -> Result<Vec<Task>, TaskServiceError> {
        let mut tasks = self.snapshots.load_tasks().await?;
        tasks.sort_by_key(Task::created_at);
        Ok(tasks)
    }

    /// # Errors
    ///
    /// Returns `TaskServiceError::Storage` if loading fails.
    pub async fn list_for_subject(&self, subject: Subject) -> Result<Vec<Task>, TaskServiceError> {
        let mut tasks = self.list().await?;
        tasks.retain(|t| t.subject() == subject);
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storage::repository::InMemoryStore;
    use study_core::model::TaskError;
    use study_core::time::fixed_clock;

    fn service() -> TaskService {
        TaskService::new(
            fixed_clock(),
            Snapshots::new(Arc::new(InMemoryStore::new())),
        )
    }

    #[tokio::test]
    async fn add_toggle_rename_delete() {
        let service = service();
        let task = service.add("  Electrostatics DPP ", Subject::Physics).await.unwrap();
        assert_eq!(task.title(), "Electrostatics DPP");

        let done = service.toggle(task.id()).await.unwrap();
        assert!(done.is_completed());

        let renamed = service.rename(task.id(), "Electrostatics PYQs").await.unwrap();
        assert_eq!(renamed.title(), "Electrostatics PYQs");
        assert!(renamed.is_completed());

        assert!(matches!(
            service.rename(task.id(), "  ").await,
            Err(TaskServiceError::Task(TaskError::EmptyTitle))
        ));

        service.add("Mole concept", Subject::Chemistry).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 2);
        assert_eq!(
            service.list_for_subject(Subject::Physics).await.unwrap(),
            vec![renamed]
        );

        service.delete(task.id()).await.unwrap();
        assert!(matches!(
            service.toggle(task.id()).await,
            Err(TaskServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn subject_must_fit_exam() {
        let service = service();
        assert!(matches!(
            service.add("Plant kingdom", Subject::Botany).await,
            Err(TaskServiceError::Task(TaskError::SubjectNotInExam(Subject::Botany)))
        ));
    }
}
