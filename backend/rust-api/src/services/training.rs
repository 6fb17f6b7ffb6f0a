//! Training data for the offline classifier pipeline.
//!
//! Features come from [`FeatureVector::extract`] and labels from the
//! threshold rule, the same two functions the live engine uses, so a fitted
//! model approximates exactly the rule it is meant to replace.

use rand::seq::IndexedRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::models::{DifficultyTier, Outcome, TierAction};
use crate::services::adaptive::features::FeatureVector;
use crate::services::adaptive::rules::{classify, WindowStats};

/// Simulated learner ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillProfile {
    Low,
    Medium,
    High,
}

impl SkillProfile {
    pub const ALL: [SkillProfile; 3] = [SkillProfile::Low, SkillProfile::Medium, SkillProfile::High];

    /// Probability of a correct answer and mean response time in seconds.
    pub fn parameters(self) -> (f64, f64) {
        match self {
            SkillProfile::Low => (0.4, 15.0),
            SkillProfile::Medium => (0.7, 10.0),
            SkillProfile::High => (0.9, 6.0),
        }
    }
}

/// Shortest response time a simulated learner can produce.
const MIN_RESPONSE_TIME: f64 = 0.5;

/// One labelled row, serialized with the feature column names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub window_acc: f64,
    pub avg_rt: f64,
    pub streak: u32,
    pub level_code: u8,
    pub action: i8,
}

impl TrainingExample {
    fn new(features: FeatureVector, action: i8) -> Self {
        Self {
            window_acc: features.window_accuracy,
            avg_rt: features.average_response_time,
            streak: features.trailing_correct_streak,
            level_code: features.tier_code,
            action,
        }
    }
}

/// Rule label for a window: promote 1, hold 0, demote -1. Empty windows hold.
pub fn label_window(window: &[Outcome], tier: DifficultyTier) -> i8 {
    WindowStats::of(window)
        .map(|stats| classify(&stats, tier))
        .unwrap_or(TierAction::Hold)
        .label()
}

pub fn simulate_session<R: Rng>(skill: SkillProfile, length: usize, rng: &mut R) -> Vec<Outcome> {
    let (p_correct, mean_rt) = skill.parameters();
    // Standard deviation is positive and finite for every profile.
    let response_time = Normal::new(mean_rt, mean_rt * 0.3).ok();

    (0..length)
        .map(|_| {
            let correct = rng.random::<f64>() < p_correct;
            let rt = response_time
                .as_ref()
                .map(|dist| dist.sample(&mut *rng))
                .unwrap_or(mean_rt);
            Outcome::new(correct, rt.max(MIN_RESPONSE_TIME))
        })
        .collect()
}

/// Sliding full windows over simulated sessions, each featurised and labelled.
pub fn generate_dataset<R: Rng>(
    num_sessions: usize,
    session_length: usize,
    window_size: usize,
    rng: &mut R,
) -> Vec<TrainingExample> {
    let mut examples = Vec::new();
    if window_size == 0 {
        return examples;
    }

    for _ in 0..num_sessions {
        let skill = *SkillProfile::ALL.choose(rng).unwrap_or(&SkillProfile::Medium);
        let tier = *DifficultyTier::ALL
            .choose(rng)
            .unwrap_or(&DifficultyTier::Easy);
        let attempts = simulate_session(skill, session_length, rng);

        for window in attempts.windows(window_size) {
            let features = FeatureVector::extract(window, tier, Some(window_size));
            examples.push(TrainingExample::new(features, label_window(window, tier)));
        }
    }

    examples
}
