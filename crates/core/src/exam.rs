use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Subject;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown exam type: {raw}")]
pub struct ParseExamTypeError {
    raw: String,
}

/// Exam the user is preparing for; selects the subject set and mark scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExamType {
    #[default]
    #[serde(rename = "JEE")]
    Jee,
    #[serde(rename = "NEET")]
    Neet,
}

/// Static mark scheme for one exam type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamConfig {
    exam: ExamType,
    total_marks: u32,
    subjects: &'static [(Subject, u32)],
}

const JEE: ExamConfig = ExamConfig {
    exam: ExamType::Jee,
    total_marks: 300,
    subjects: &[
        (Subject::Physics, 100),
        (Subject::Chemistry, 100),
        (Subject::Mathematics, 100),
    ],
};

const NEET: ExamConfig = ExamConfig {
    exam: ExamType::Neet,
    total_marks: 720,
    subjects: &[
        (Subject::Physics, 180),
        (Subject::Chemistry, 180),
        (Subject::Botany, 180),
        (Subject::Zoology, 180),
    ],
};

impl ExamType {
    pub const ALL: [ExamType; 2] = [ExamType::Jee, ExamType::Neet];

    #[must_use]
    pub fn config(self) -> &'static ExamConfig {
        match self {
            ExamType::Jee => &JEE,
            ExamType::Neet => &NEET,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::Jee => "JEE",
            ExamType::Neet => "NEET",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = ParseExamTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JEE" => Ok(Self::Jee),
            "NEET" => Ok(Self::Neet),
            _ => Err(ParseExamTypeError { raw: s.to_string() }),
        }
    }
}

impl ExamConfig {
    #[must_use]
    pub fn exam(&self) -> ExamType {
        self.exam
    }

    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    /// Exam subjects in display order (never includes `Classes`).
    pub fn subjects(&self) -> impl Iterator<Item = Subject> + '_ {
        self.subjects.iter().map(|(subject, _)| *subject)
    }

    #[must_use]
    pub fn max_marks(&self, subject: Subject) -> Option<u32> {
        self.subjects
            .iter()
            .find(|(s, _)| *s == subject)
            .map(|(_, max)| *max)
    }

    /// True if `subject` is one of the exam's scored subjects.
    #[must_use]
    pub fn contains(&self, subject: Subject) -> bool {
        self.max_marks(subject).is_some()
    }

    /// True if sessions and tasks may use `subject` under this exam.
    #[must_use]
    pub fn allows(&self, subject: Subject) -> bool {
        subject == Subject::Classes || self.contains(subject)
    }

    /// Exam subjects followed by `Classes`: the key set of every aggregate.
    #[must_use]
    pub fn tracked_subjects(&self) -> Vec<Subject> {
        self.subjects().chain([Subject::Classes]).collect()
    }

    #[must_use]
    pub fn first_subject(&self) -> Subject {
        self.subjects[0].0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jee_and_neet_totals_match_subject_marks() {
        for exam in ExamType::ALL {
            let config = exam.config();
            let sum: u32 = config
                .subjects()
                .filter_map(|s| config.max_marks(s))
                .sum();
            assert_eq!(sum, config.total_marks(), "{exam}");
        }
    }

    #[test]
    fn classes_is_allowed_but_not_scored() {
        let jee = ExamType::Jee.config();
        assert!(jee.allows(Subject::Classes));
        assert!(!jee.contains(Subject::Classes));
        assert!(!jee.allows(Subject::Botany));
        assert_eq!(jee.first_subject(), Subject::Physics);
        assert_eq!(
            ExamType::Neet.config().tracked_subjects(),
            vec![
                Subject::Physics,
                Subject::Chemistry,
                Subject::Botany,
                Subject::Zoology,
                Subject::Classes,
            ]
        );
    }

    #[test]
    fn exam_type_parses_case_insensitively() {
        assert_eq!("neet".parse::<ExamType>().unwrap(), ExamType::Neet);
        assert_eq!(" JEE ".parse::<ExamType>().unwrap(), ExamType::Jee);
        assert!("SAT".parse::<ExamType>().is_err());
    }
}
