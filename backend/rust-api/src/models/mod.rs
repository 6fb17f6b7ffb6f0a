use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

pub mod attempt;
pub mod decision;
pub mod puzzle;
pub mod tier;

pub use attempt::{Attempt, Outcome};
pub use decision::{Decision, DecisionSource, TierAction};
pub use puzzle::{Puzzle, PuzzleView};
pub use tier::DifficultyTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "User name must be between 1 and 100 characters"
    ))]
    pub user_name: String,

    #[serde(default)]
    pub initial_level: Option<DifficultyTier>,

    #[validate(range(min = 3, max = 100, message = "Rounds must be between 3 and 100"))]
    pub rounds: Option<u32>,

    #[validate(range(min = 1, max = 6, message = "Window size must be between 1 and 6"))]
    pub window_size: Option<usize>,

    #[serde(default)]
    pub use_learned: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub current_level: DifficultyTier,
    pub rounds_left: u32,
    pub window_size: usize,
    pub use_learned: bool,
    pub puzzle: PuzzleView,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(max = 64, message = "Answer must be at most 64 characters"))]
    pub answer: String,

    /// Overrides the server-measured response time.
    #[validate(range(min = 0.0, message = "Response time must not be negative"))]
    pub response_time_seconds: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub correct: bool,
    pub correct_answer: String,
    pub response_time: f64,
    pub previous_level: DifficultyTier,
    pub next_level: DifficultyTier,
    pub decision: Decision,
    pub rounds_left: u32,
    pub next_puzzle: Option<PuzzleView>,
}

/// Live view of a session, without the attempt log.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub user: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub current_level: DifficultyTier,
    pub rounds_left: u32,
    pub window_size: usize,
    pub use_learned: bool,
    pub num_attempts: usize,
    pub accuracy: f64,
    pub avg_response_time: f64,
    pub level_counts: BTreeMap<DifficultyTier, usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub num_attempts: usize,
    pub accuracy: f64,
    pub avg_response_time: f64,
    pub final_level: DifficultyTier,
    pub attempts: Vec<Attempt>,
}
