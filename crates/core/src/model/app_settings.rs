use thiserror::Error;

use crate::exam::ExamType;
use crate::model::{StreakSettings, Subject};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AppSettingsError {
    #[error("subject {subject} is not available under {exam}")]
    SubjectNotInExam { subject: Subject, exam: ExamType },
}

/// User preferences that scope every aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    exam: ExamType,
    active_subject: Subject,
    streak: StreakSettings,
}

impl AppSettings {
    /// # Errors
    ///
    /// Returns `AppSettingsError::SubjectNotInExam` if the active subject is not
    /// allowed by the exam.
    pub fn new(
        exam: ExamType,
        active_subject: Subject,
        streak: StreakSettings,
    ) -> Result<Self, AppSettingsError> {
        if !exam.config().allows(active_subject) {
            return Err(AppSettingsError::SubjectNotInExam {
                subject: active_subject,
                exam,
            });
        }
        Ok(Self {
            exam,
            active_subject,
            streak,
        })
    }

    #[must_use]
    pub fn exam(&self) -> ExamType {
        self.exam
    }

    #[must_use]
    pub fn active_subject(&self) -> Subject {
        self.active_subject
    }

    #[must_use]
    pub fn streak(&self) -> StreakSettings {
        self.streak
    }

    /// # Errors
    ///
    /// Returns `AppSettingsError::SubjectNotInExam` if the exam does not allow `subject`.
    pub fn with_active_subject(&self, subject: Subject) -> Result<Self, AppSettingsError> {
        Self::new(self.exam, subject, self.streak)
    }

    #[must_use]
    pub fn with_streak(&self, streak: StreakSettings) -> Self {
        Self {
            streak,
            ..self.clone()
        }
    }

    /// Settings after an exam switch: the active subject resets to the new exam's first subject.
    #[must_use]
    pub fn for_exam(&self, exam: ExamType) -> Self {
        Self {
            exam,
            active_subject: exam.config().first_subject(),
            streak: self.streak,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        let exam = ExamType::default();
        Self {
            exam,
            active_subject: exam.config().first_subject(),
            streak: StreakSettings::default(),
        }
    }
}

/// Daily question target across all non-`Classes` subjects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuestionGoal(u32);

impl QuestionGoal {
    pub const DEFAULT_DAILY: u32 = 100;

    #[must_use]
    pub fn new(daily: u32) -> Self {
        Self(daily)
    }

    #[must_use]
    pub fn daily(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn weekly(self) -> u32 {
        self.0.saturating_mul(7)
    }
}

impl Default for QuestionGoal {
    fn default() -> Self {
        Self(Self::DEFAULT_DAILY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_subject_must_fit_exam() {
        let err = AppSettings::new(ExamType::Neet, Subject::Mathematics, StreakSettings::default())
            .unwrap_err();
        assert!(matches!(err, AppSettingsError::SubjectNotInExam { .. }));
    }

    #[test]
    fn switching_exam_resets_active_subject() {
        let settings = AppSettings::default()
            .with_active_subject(Subject::Mathematics)
            .unwrap();
        let neet = settings.for_exam(ExamType::Neet);
        assert_eq!(neet.exam(), ExamType::Neet);
        assert_eq!(neet.active_subject(), Subject::Physics);
        assert_eq!(neet.streak(), settings.streak());
    }

    #[test]
    fn weekly_goal_is_seven_days() {
        assert_eq!(QuestionGoal::new(80).weekly(), 560);
        assert_eq!(QuestionGoal::default().daily(), 100);
    }
}
