use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown subject: {raw}")]
pub struct ParseSubjectError {
    raw: String,
}

/// Subject a session, task or test section is attributed to.
///
/// `Classes` covers lecture time; it is tracked under every exam but its
/// question counts never count towards the question goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Physics,
    Chemistry,
    Mathematics,
    Botany,
    Zoology,
    Classes,
}

impl Subject {
    pub const ALL: [Subject; 6] = [
        Subject::Physics,
        Subject::Chemistry,
        Subject::Mathematics,
        Subject::Botany,
        Subject::Zoology,
        Subject::Classes,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Mathematics => "mathematics",
            Subject::Botany => "botany",
            Subject::Zoology => "zoology",
            Subject::Classes => "classes",
        }
    }

    #[must_use]
    pub fn counts_questions(self) -> bool {
        self != Subject::Classes
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ParseSubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == wanted)
            .ok_or_else(|| ParseSubjectError { raw: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_round_trips_through_str() {
        for subject in Subject::ALL {
            assert_eq!(subject.to_string().parse::<Subject>().unwrap(), subject);
        }
        assert_eq!("Maths".parse::<Subject>().ok(), None);
    }
}
