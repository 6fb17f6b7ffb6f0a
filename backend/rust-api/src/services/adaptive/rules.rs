use crate::models::attempt::outcomes;
use crate::models::{Decision, DecisionSource, DifficultyTier, Outcome, TierAction};

use super::history::AttemptHistory;
use super::learned::ProviderError;
use super::DecisionProvider;

pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Minimum window accuracy for promotion.
pub const PROMOTE_ACCURACY: f64 = 0.8;
/// Window accuracy at or below which the learner is demoted.
pub const DEMOTE_ACCURACY: f64 = 0.5;

/// Response-time bounds for one tier, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    /// At or below: fast enough to promote.
    pub fast: f64,
    /// At or above: slow enough to demote.
    pub slow: f64,
}

impl TierThresholds {
    pub fn for_tier(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::Easy => Self {
                fast: 8.0,
                slow: 15.0,
            },
            DifficultyTier::Medium => Self {
                fast: 12.0,
                slow: 20.0,
            },
            DifficultyTier::Hard => Self {
                fast: 20.0,
                slow: 30.0,
            },
        }
    }
}

/// Accuracy and mean response time over a non-empty window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub accuracy: f64,
    pub average_response_time: f64,
}

impl WindowStats {
    pub fn of(window: &[Outcome]) -> Option<Self> {
        if window.is_empty() {
            return None;
        }
        let n = window.len() as f64;
        Some(Self {
            accuracy: window.iter().filter(|o| o.correct).count() as f64 / n,
            average_response_time: window.iter().map(|o| o.response_time).sum::<f64>() / n,
        })
    }
}

/// Threshold rule. Promotion is checked before demotion.
pub fn classify(stats: &WindowStats, tier: DifficultyTier) -> TierAction {
    let thresholds = TierThresholds::for_tier(tier);
    if stats.accuracy >= PROMOTE_ACCURACY && stats.average_response_time <= thresholds.fast {
        TierAction::Promote
    } else if stats.accuracy <= DEMOTE_ACCURACY || stats.average_response_time >= thresholds.slow
    {
        TierAction::Demote
    } else {
        TierAction::Hold
    }
}

/// Decides on the raw window. A window shorter than requested is still a
/// valid, smaller window; an empty one holds.
pub fn evaluate(window: &[Outcome], tier: DifficultyTier) -> Decision {
    let Some(stats) = WindowStats::of(window) else {
        return Decision {
            action: TierAction::Hold,
            source: DecisionSource::Rule,
            next_tier: tier,
            rationale: "no data yet (rule)".to_string(),
            importances: None,
        };
    };

    let action = classify(&stats, tier);
    Decision {
        action,
        source: DecisionSource::Rule,
        next_tier: action.apply(tier),
        rationale: format!(
            "{} (rule): acc={:.2}, time={:.1}s",
            action.as_str(),
            stats.accuracy,
            stats.average_response_time
        ),
        importances: None,
    }
}

/// Deterministic threshold engine. Always available, never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn decide_on(
        &self,
        history: &AttemptHistory,
        current: DifficultyTier,
        window_size: usize,
    ) -> Decision {
        evaluate(&outcomes(history.last_n(window_size)), current)
    }
}

impl DecisionProvider for RuleEngine {
    fn source(&self) -> DecisionSource {
        DecisionSource::Rule
    }

    fn is_available(&self) -> bool {
        true
    }

    fn decide(
        &self,
        history: &AttemptHistory,
        current: DifficultyTier,
        window_size: usize,
    ) -> Result<Decision, ProviderError> {
        Ok(self.decide_on(history, current, window_size))
    }
}
