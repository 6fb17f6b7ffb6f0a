use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::DifficultyTier;

/// Response time assigned to synthetic padding entries.
pub const SENTINEL_RESPONSE_TIME: f64 = 999.0;

/// One recorded answer event. Immutable once appended to a session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Position within the session, starting at 1.
    pub ordinal: u64,
    pub timestamp: DateTime<Utc>,
    pub question_id: String,
    pub question: String,
    pub level: DifficultyTier,
    pub correct: bool,
    pub given_answer: String,
    pub correct_answer: String,
    /// Seconds between the puzzle being shown and the answer arriving.
    pub response_time: f64,
}

impl Attempt {
    pub fn outcome(&self) -> Outcome {
        Outcome {
            correct: self.correct,
            response_time: self.response_time,
        }
    }
}

/// The part of an attempt the decision engine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub correct: bool,
    pub response_time: f64,
}

impl Outcome {
    /// Failing entry used to pad a window that is shorter than requested.
    pub const SENTINEL: Outcome = Outcome {
        correct: false,
        response_time: SENTINEL_RESPONSE_TIME,
    };

    pub fn new(correct: bool, response_time: f64) -> Self {
        Self {
            correct,
            response_time,
        }
    }
}

/// Collects the decision-relevant outcomes of a window of attempts.
pub fn outcomes(attempts: &[Attempt]) -> Vec<Outcome> {
    attempts.iter().map(Attempt::outcome).collect()
}
