use serde::{Deserialize, Serialize};

use super::tier::DifficultyTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }
}

/// Generated arithmetic puzzle. The answer never leaves the server before
/// the learner has replied; clients see a [`PuzzleView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    pub question: String,
    pub answer: f64,
    pub level: DifficultyTier,
    pub op: Operator,
    pub operands: (i64, i64),
}

impl Puzzle {
    /// Answer as shown to learners: integers without a fractional part.
    pub fn answer_text(&self) -> String {
        if self.answer.fract() == 0.0 {
            format!("{}", self.answer as i64)
        } else {
            format!("{}", self.answer)
        }
    }

    /// Numeric comparison when the reply parses as a number, exact text otherwise.
    pub fn check_answer(&self, given: &str) -> bool {
        let given = given.trim();
        match given.parse::<f64>() {
            Ok(value) => (value - self.answer).abs() < 1e-6,
            Err(_) => given == self.answer_text(),
        }
    }

    pub fn view(&self) -> PuzzleView {
        PuzzleView {
            id: self.id.clone(),
            question: self.question.clone(),
            level: self.level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleView {
    pub id: String,
    pub question: String,
    pub level: DifficultyTier,
}
