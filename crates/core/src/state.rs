use crate::exam::ExamType;
use crate::model::{StudySession, Subject, Task, TestRecord};

/// The complete in-memory record set for one user.
///
/// Mutations never happen in place: operations take the current state and
/// return a replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyState {
    pub exam: ExamType,
    pub active_subject: Subject,
    pub sessions: Vec<StudySession>,
    pub tasks: Vec<Task>,
    pub tests: Vec<TestRecord>,
}

/// Audit record of an exam switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamMigration {
    pub from: ExamType,
    pub to: ExamType,
    pub sessions_discarded: usize,
    pub tasks_discarded: usize,
    pub tests_discarded: usize,
}

impl ExamMigration {
    /// True if the switch changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

impl StudyState {
    #[must_use]
    pub fn empty(exam: ExamType) -> Self {
        Self {
            exam,
            active_subject: exam.config().first_subject(),
            sessions: Vec::new(),
            tasks: Vec::new(),
            tests: Vec::new(),
        }
    }

    /// Re-scope the state to `target`.
    ///
    /// Sessions and tasks whose subject the target exam does not allow are
    /// dropped, every test record is dropped (mark schemes do not convert),
    /// and the active subject resets to the target's first subject. There is
    /// no way back: the discarded records are gone from the returned state.
    #[must_use]
    pub fn switch_exam(self, target: ExamType) -> (StudyState, ExamMigration) {
        if self.exam == target {
            let migration = ExamMigration {
                from: self.exam,
                to: target,
                sessions_discarded: 0,
                tasks_discarded: 0,
                tests_discarded: 0,
            };
            return (self, migration);
        }

        let config = target.config();
        let before = (self.sessions.len(), self.tasks.len(), self.tests.len());

        let sessions: Vec<StudySession> = self
            .sessions
            .into_iter()
            .filter(|s| config.allows(s.subject()))
            .collect();
        let tasks: Vec<Task> = self
            .tasks
            .into_iter()
            .filter(|t| config.allows(t.subject()))
            .collect();

        let migration = ExamMigration {
            from: self.exam,
            to: target,
            sessions_discarded: before.0 - sessions.len(),
            tasks_discarded: before.1 - tasks.len(),
            tests_discarded: before.2,
        };

        let next = StudyState {
            exam: target,
            active_subject: config.first_subject(),
            sessions,
            tasks,
            tests: Vec::new(),
        };
        (next, migration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        SessionDraft, SessionId, SubjectScore, TaskId, TestRecordDraft, TestRecordId,
    };
    use crate::time::fixed_now;
    use chrono::{Duration, NaiveDate};

    fn session(subject: Subject) -> StudySession {
        let start = fixed_now();
        SessionDraft::new(subject, start, start + Duration::minutes(40))
            .validate(ExamType::Jee.config())
            .unwrap()
            .assign_id(SessionId::generate())
    }

    fn task(subject: Subject) -> Task {
        Task::new(TaskId::generate(), "revise", subject, ExamType::Jee.config(), fixed_now())
            .unwrap()
    }

    fn jee_state() -> StudyState {
        let test = TestRecordDraft {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            time_spent_minutes: 180,
            subjects: vec![SubjectScore::new(Subject::Mathematics, 80, 25, 22)],
            notes: None,
        }
        .validate(TestRecordId::generate(), ExamType::Jee.config())
        .unwrap();

        StudyState {
            exam: ExamType::Jee,
            active_subject: Subject::Mathematics,
            sessions: vec![
                session(Subject::Physics),
                session(Subject::Mathematics),
                session(Subject::Chemistry),
                session(Subject::Classes),
            ],
            tasks: vec![task(Subject::Mathematics), task(Subject::Chemistry)],
            tests: vec![test],
        }
    }

    #[test]
    fn switching_to_neet_drops_mathematics_and_tests() {
        let before = jee_state();
        let kept_sessions: Vec<_> = before
            .sessions
            .iter()
            .filter(|s| s.subject() != Subject::Mathematics)
            .cloned()
            .collect();
        let kept_task = before.tasks[1].clone();

        let (after, migration) = before.switch_exam(ExamType::Neet);

        assert_eq!(after.exam, ExamType::Neet);
        assert_eq!(after.active_subject, Subject::Physics);
        assert_eq!(after.sessions, kept_sessions);
        assert_eq!(after.tasks, vec![kept_task]);
        assert!(after.tests.is_empty());
        assert_eq!(
            migration,
            ExamMigration {
                from: ExamType::Jee,
                to: ExamType::Neet,
                sessions_discarded: 1,
                tasks_discarded: 1,
                tests_discarded: 1,
            }
        );
    }

    #[test]
    fn switching_to_same_exam_is_noop() {
        let before = jee_state();
        let (after, migration) = before.clone().switch_exam(ExamType::Jee);
        assert!(migration.is_noop());
        assert_eq!(after, before);
    }
}
