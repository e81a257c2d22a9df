use chrono::{FixedOffset, NaiveDate};
use thiserror::Error;

use crate::day::{LogicalDated, LogicalDay};
use crate::exam::{ExamConfig, ExamType};
use crate::model::{Subject, TestRecordId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestRecordError {
    #[error("subject {0} is not part of the {1} paper")]
    SubjectNotInExam(Subject, ExamType),

    #[error("subject {0} appears more than once")]
    DuplicateSubject(Subject),

    #[error("{subject} score {score} is outside -{max}..={max}")]
    ScoreExceedsMax { subject: Subject, score: i32, max: u32 },

    #[error("{subject}: correct answers ({correct}) exceed attempted ({attempted})")]
    CorrectExceedsAttempted {
        subject: Subject,
        correct: u32,
        attempted: u32,
    },

    #[error("a test record needs at least one subject")]
    NoSubjects,

    #[error("total marks {stored} do not match the {exam} paper ({expected})")]
    TotalMarksMismatch {
        exam: ExamType,
        stored: u32,
        expected: u32,
    },
}

//
// ─── SUBJECT BREAKDOWN ─────────────────────────────────────────────────────────
//

/// Result for one subject of a mock test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectScore {
    pub subject: Subject,
    pub score: i32,
    pub attempted: u32,
    pub correct: u32,
    pub topics: Vec<String>,
}

impl SubjectScore {
    #[must_use]
    pub fn new(subject: Subject, score: i32, attempted: u32, correct: u32) -> Self {
        Self {
            subject,
            score,
            attempted,
            correct,
            topics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Derived: attempted minus correct.
    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.attempted.saturating_sub(self.correct)
    }

    /// Percentage of attempted questions answered correctly, 0 when none attempted.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        rounded_percent(u64::from(self.correct), u64::from(self.attempted))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn rounded_percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

//
// ─── TEST RECORD ───────────────────────────────────────────────────────────────
//

/// Input for recording a mock test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecordDraft {
    pub date: NaiveDate,
    pub time_spent_minutes: u32,
    pub subjects: Vec<SubjectScore>,
    pub notes: Option<String>,
}

impl TestRecordDraft {
    /// Validate the draft against the exam's mark scheme.
    ///
    /// # Errors
    ///
    /// Returns `TestRecordError` if a subject is foreign to the exam or repeated,
    /// a score is out of range, or correct answers exceed attempts.
    pub fn validate(
        self,
        id: TestRecordId,
        exam: &ExamConfig,
    ) -> Result<TestRecord, TestRecordError> {
        validate_subjects(&self.subjects, exam)?;
        Ok(TestRecord {
            id,
            exam: exam.exam(),
            date: self.date,
            total_score: self.subjects.iter().map(|s| s.score).sum(),
            total_marks: exam.total_marks(),
            time_spent_minutes: self.time_spent_minutes,
            subjects: self.subjects,
            notes: self
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }
}

fn validate_subjects(subjects: &[SubjectScore], exam: &ExamConfig) -> Result<(), TestRecordError> {
    if subjects.is_empty() {
        return Err(TestRecordError::NoSubjects);
    }
    for (idx, entry) in subjects.iter().enumerate() {
        let Some(max) = exam.max_marks(entry.subject) else {
            return Err(TestRecordError::SubjectNotInExam(entry.subject, exam.exam()));
        };
        if subjects[..idx].iter().any(|s| s.subject == entry.subject) {
            return Err(TestRecordError::DuplicateSubject(entry.subject));
        }
        if entry.score.unsigned_abs() > max {
            return Err(TestRecordError::ScoreExceedsMax {
                subject: entry.subject,
                score: entry.score,
                max,
            });
        }
        if entry.correct > entry.attempted {
            return Err(TestRecordError::CorrectExceedsAttempted {
                subject: entry.subject,
                correct: entry.correct,
                attempted: entry.attempted,
            });
        }
    }
    Ok(())
}

/// A recorded mock-test result. Only meaningful under the exam it was taken for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    id: TestRecordId,
    exam: ExamType,
    date: NaiveDate,
    total_score: i32,
    total_marks: u32,
    time_spent_minutes: u32,
    subjects: Vec<SubjectScore>,
    notes: Option<String>,
}

impl TestRecord {
    /// Rehydrate a test record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TestRecordError` if the breakdown violates the exam's mark scheme
    /// or the stored total marks disagree with it.
    pub fn from_persisted(
        id: TestRecordId,
        exam: ExamType,
        date: NaiveDate,
        total_marks: u32,
        time_spent_minutes: u32,
        subjects: Vec<SubjectScore>,
        notes: Option<String>,
    ) -> Result<Self, TestRecordError> {
        let config = exam.config();
        if total_marks != config.total_marks() {
            return Err(TestRecordError::TotalMarksMismatch {
                exam,
                stored: total_marks,
                expected: config.total_marks(),
            });
        }
        TestRecordDraft {
            date,
            time_spent_minutes,
            subjects,
            notes,
        }
        .validate(id, config)
    }

    #[must_use]
    pub fn id(&self) -> TestRecordId {
        self.id
    }

    #[must_use]
    pub fn exam(&self) -> ExamType {
        self.exam
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn total_score(&self) -> i32 {
        self.total_score
    }

    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    #[must_use]
    pub fn time_spent_minutes(&self) -> u32 {
        self.time_spent_minutes
    }

    #[must_use]
    pub fn subjects(&self) -> &[SubjectScore] {
        &self.subjects
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Overall accuracy across all subjects, 0 when nothing was attempted.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        let (correct, attempted) = self.subjects.iter().fold((0_u64, 0_u64), |(c, a), s| {
            (c + u64::from(s.correct), a + u64::from(s.attempted))
        });
        rounded_percent(correct, attempted)
    }
}

impl LogicalDated for TestRecord {
    /// Test records carry a calendar date, which is their logical day as is.
    fn logical_day(&self, _offset: FixedOffset) -> LogicalDay {
        LogicalDay::from_date(self.date)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
