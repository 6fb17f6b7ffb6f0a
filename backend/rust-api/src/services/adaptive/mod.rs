//! Adaptive difficulty engine: decides whether the next puzzle should be
//! easier, harder or at the same tier, from the learner's recent attempts.
//!
//! Two engines implement [`DecisionProvider`]: the threshold rule in
//! [`rules`] and the classifier-backed provider in [`learned`]. The
//! [`coordinator::AdaptiveCoordinator`] picks one per request and falls back
//! to the rule whenever the learned path cannot answer.

pub mod classifier;
pub mod coordinator;
pub mod features;
pub mod history;
pub mod learned;
pub mod rules;

use crate::models::{Decision, DecisionSource, DifficultyTier};
use crate::models::decision::ModelInfo;

pub use coordinator::AdaptiveCoordinator;
pub use features::FeatureVector;
pub use history::AttemptHistory;
pub use learned::{LearnedDecisionProvider, ModelSource, ProviderError};
pub use rules::RuleEngine;

/// A strategy that turns a session's recent history into a tier decision.
pub trait DecisionProvider: Send + Sync {
    fn source(&self) -> DecisionSource;

    /// Whether `decide` can currently produce decisions at all.
    fn is_available(&self) -> bool;

    fn decide(
        &self,
        history: &AttemptHistory,
        current: DifficultyTier,
        window_size: usize,
    ) -> Result<Decision, ProviderError>;

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            available: self.is_available(),
            ..ModelInfo::default()
        }
    }
}
