use serde::{Deserialize, Serialize};

use super::tier::DifficultyTier;

/// Tier transition chosen for the next puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierAction {
    Demote,
    Hold,
    Promote,
}

impl TierAction {
    /// Class label shared with the training pipeline: demote -1, hold 0, promote 1.
    pub fn label(self) -> i8 {
        match self {
            TierAction::Demote => -1,
            TierAction::Hold => 0,
            TierAction::Promote => 1,
        }
    }

    pub fn from_label(label: i8) -> Option<Self> {
        match label {
            -1 => Some(TierAction::Demote),
            0 => Some(TierAction::Hold),
            1 => Some(TierAction::Promote),
            _ => None,
        }
    }

    pub fn apply(self, tier: DifficultyTier) -> DifficultyTier {
        match self {
            TierAction::Demote => tier.decrease(),
            TierAction::Hold => tier,
            TierAction::Promote => tier.increase(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TierAction::Demote => "Demote",
            TierAction::Hold => "Hold",
            TierAction::Promote => "Promote",
        }
    }
}

/// Which engine produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Rule,
    Learned,
}

impl DecisionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionSource::Rule => "rule",
            DecisionSource::Learned => "learned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: TierAction,
    pub source: DecisionSource,
    pub next_tier: DifficultyTier,
    /// Human-readable explanation including the numeric evidence used.
    pub rationale: String,
    /// Classifier-global feature importances, learned decisions only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importances: Option<Vec<f64>>,
}

/// Describes the learned model a deployment is running with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    pub available: bool,
    pub model: Option<String>,
    pub window_size: Option<usize>,
    pub features: Vec<String>,
    pub importances: Vec<FeatureImportance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}
