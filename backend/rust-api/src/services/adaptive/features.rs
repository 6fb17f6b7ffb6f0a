use serde::{Deserialize, Serialize};
use std::iter;

use crate::models::attempt::SENTINEL_RESPONSE_TIME;
use crate::models::{DifficultyTier, Outcome};

/// Column names of the model input, in vector order.
pub const FEATURE_NAMES: [&str; 4] = ["window_acc", "avg_rt", "streak", "level_code"];

/// Model input derived from a window of outcomes and the current tier.
///
/// The same extractor feeds runtime decisions and the training dataset
/// generator, so a classifier never sees features computed differently from
/// the ones it was fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub window_accuracy: f64,
    pub average_response_time: f64,
    pub trailing_correct_streak: u32,
    pub tier_code: u8,
}

impl FeatureVector {
    /// Builds the vector for `window`, left-padding it with failing sentinel
    /// outcomes up to `requested` entries when history is short. Padding
    /// biases a young session toward demotion rather than promotion.
    pub fn extract(window: &[Outcome], tier: DifficultyTier, requested: Option<usize>) -> Self {
        Self::extract_with_code(window, tier.code(), requested)
    }

    pub fn extract_with_code(window: &[Outcome], tier_code: u8, requested: Option<usize>) -> Self {
        let pad = requested
            .map(|size| size.saturating_sub(window.len()))
            .unwrap_or(0);
        let entries: Vec<Outcome> = iter::repeat(Outcome::SENTINEL)
            .take(pad)
            .chain(window.iter().copied())
            .collect();

        let n = entries.len();
        let window_accuracy = if n > 0 {
            entries.iter().filter(|o| o.correct).count() as f64 / n as f64
        } else {
            0.0
        };
        let average_response_time = if n > 0 {
            entries.iter().map(|o| o.response_time).sum::<f64>() / n as f64
        } else {
            SENTINEL_RESPONSE_TIME
        };
        let trailing_correct_streak =
            entries.iter().rev().take_while(|o| o.correct).count() as u32;

        Self {
            window_accuracy,
            average_response_time,
            trailing_correct_streak,
            tier_code,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.window_accuracy,
            self.average_response_time,
            f64::from(self.trailing_correct_streak),
            f64::from(self.tier_code),
        ]
    }
}
