use std::sync::{Arc, OnceLock};

use crate::metrics::{ADAPTIVE_DECISIONS_TOTAL, LEARNED_FALLBACKS_TOTAL};
use crate::models::decision::ModelInfo;
use crate::models::{Decision, DifficultyTier};

use super::history::AttemptHistory;
use super::learned::{LearnedDecisionProvider, ModelSource, ProviderError};
use super::rules::RuleEngine;
use super::DecisionProvider;

type ProviderFactory = Box<dyn Fn() -> Arc<dyn DecisionProvider> + Send + Sync>;

/// Public entry point of the adaptive engine.
///
/// Owns an optional factory for the learned provider. The provider is built
/// at most once, on first use or by [`warm_up`](Self::warm_up), and the
/// result is kept even when it came out unavailable.
pub struct AdaptiveCoordinator {
    rule: RuleEngine,
    factory: Option<ProviderFactory>,
    learned: OnceLock<Arc<dyn DecisionProvider>>,
}

impl AdaptiveCoordinator {
    /// Coordinator for deployments without a learned path.
    pub fn rule_only() -> Self {
        Self {
            rule: RuleEngine,
            factory: None,
            learned: OnceLock::new(),
        }
    }

    pub fn with_learned<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn DecisionProvider> + Send + Sync + 'static,
    {
        Self {
            rule: RuleEngine,
            factory: Some(Box::new(factory)),
            learned: OnceLock::new(),
        }
    }

    pub fn from_model_source(source: ModelSource) -> Self {
        Self::with_learned(move || {
            Arc::new(LearnedDecisionProvider::load(&source)) as Arc<dyn DecisionProvider>
        })
    }

    /// The learned provider, built on first call. `None` when this
    /// deployment has no learned path at all.
    pub fn learned_provider(&self) -> Option<&Arc<dyn DecisionProvider>> {
        let factory = self.factory.as_ref()?;
        Some(self.learned.get_or_init(|| factory()))
    }

    /// Builds the learned provider ahead of the first decision.
    pub fn warm_up(&self) -> bool {
        self.learned_provider()
            .map(|provider| provider.is_available())
            .unwrap_or(false)
    }

    pub fn model_info(&self) -> ModelInfo {
        match self.learned_provider() {
            Some(provider) => provider.model_info(),
            None => ModelInfo {
                load_error: Some("learned decisions are disabled".to_string()),
                ..ModelInfo::default()
            },
        }
    }

    /// Next tier for the session. Never fails: every problem on the learned
    /// path degrades to the threshold rule for this call.
    pub fn decide(
        &self,
        history: &AttemptHistory,
        current: DifficultyTier,
        window_size: usize,
        use_learned: bool,
    ) -> Decision {
        let decision = if use_learned {
            self.decide_learned(history, current, window_size)
        } else {
            self.rule.decide_on(history, current, window_size)
        };

        ADAPTIVE_DECISIONS_TOTAL
            .with_label_values(&[decision.source.as_str(), decision.action.as_str()])
            .inc();

        decision
    }

    fn decide_learned(
        &self,
        history: &AttemptHistory,
        current: DifficultyTier,
        window_size: usize,
    ) -> Decision {
        let Some(provider) = self.learned_provider() else {
            return self.rule.decide_on(history, current, window_size);
        };

        if !provider.is_available() {
            LEARNED_FALLBACKS_TOTAL
                .with_label_values(&["unavailable"])
                .inc();
            return self.rule.decide_on(history, current, window_size);
        }

        match provider.decide(history, current, window_size) {
            Ok(decision) => decision,
            Err(ProviderError::Unavailable) => {
                LEARNED_FALLBACKS_TOTAL
                    .with_label_values(&["unavailable"])
                    .inc();
                self.rule.decide_on(history, current, window_size)
            }
            Err(ProviderError::PredictionFailed(reason)) => {
                tracing::warn!("Learned prediction failed, using rule: {}", reason);
                LEARNED_FALLBACKS_TOTAL
                    .with_label_values(&["prediction_failed"])
                    .inc();
                self.rule.decide_on(history, current, window_size)
            }
        }
    }
}
