use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::attempt::outcomes;
use crate::models::decision::{FeatureImportance, ModelInfo};
use crate::models::{Decision, DecisionSource, DifficultyTier, Outcome, TierAction};

use super::classifier::{Classifier, ClassifierError, DecisionTreeModel, ModelMetadata};
use super::features::{FeatureVector, FEATURE_NAMES};
use super::history::AttemptHistory;
use super::DecisionProvider;

/// Why the learned path could not answer. Both variants mean "use the rule".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("learned model is unavailable")]
    Unavailable,
    #[error("prediction failed: {0}")]
    PredictionFailed(String),
}

impl From<ClassifierError> for ProviderError {
    fn from(err: ClassifierError) -> Self {
        ProviderError::PredictionFailed(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model file {0} not found")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model: {0}")]
    Invalid(#[from] ClassifierError),
    #[error("incompatible model: {0}")]
    Incompatible(String),
}

/// Where the model artifact and its optional metadata live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub model_path: PathBuf,
    pub meta_path: PathBuf,
}

impl ModelSource {
    pub fn new(model_path: impl Into<PathBuf>, meta_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            meta_path: meta_path.into(),
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::Missing(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ModelLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a decision-tree artifact and checks it against the extractor.
pub fn load_model(
    source: &ModelSource,
) -> Result<(DecisionTreeModel, Option<ModelMetadata>), ModelLoadError> {
    let tree: DecisionTreeModel = read_json(&source.model_path)?;
    tree.validate()?;
    if tree.n_features != FEATURE_NAMES.len() {
        return Err(ModelLoadError::Incompatible(format!(
            "model expects {} features, extractor produces {}",
            tree.n_features,
            FEATURE_NAMES.len()
        )));
    }

    // Metadata is optional: a missing or unreadable file only loses the description.
    let metadata = match read_json::<ModelMetadata>(&source.meta_path) {
        Ok(meta) => Some(meta),
        Err(ModelLoadError::Missing(_)) => None,
        Err(e) => {
            tracing::warn!("Ignoring model metadata: {}", e);
            None
        }
    };

    if let Some(meta) = &metadata {
        if !meta.features.is_empty() && meta.features != FEATURE_NAMES {
            return Err(ModelLoadError::Incompatible(format!(
                "trained on features {:?}, extractor produces {:?}",
                meta.features, FEATURE_NAMES
            )));
        }
    }

    Ok((tree, metadata))
}

/// Decision provider backed by an externally trained classifier.
///
/// A provider whose load failed stays unavailable for its whole lifetime;
/// retrying means building a new instance.
#[derive(Debug)]
pub struct LearnedDecisionProvider {
    classifier: Option<Box<dyn Classifier>>,
    metadata: Option<ModelMetadata>,
    load_error: Option<String>,
}

impl LearnedDecisionProvider {
    pub fn load(source: &ModelSource) -> Self {
        match load_model(source) {
            Ok((tree, metadata)) => {
                tracing::info!(
                    "Loaded learned model from {} (metadata: {})",
                    source.model_path.display(),
                    if metadata.is_some() { "yes" } else { "no" }
                );
                Self::from_classifier(Box::new(tree), metadata)
            }
            Err(ModelLoadError::Missing(path)) => {
                tracing::info!(
                    "No learned model at {}, decisions use the threshold rule",
                    path.display()
                );
                Self::unavailable(format!("model file {} not found", path.display()))
            }
            Err(e) => {
                tracing::warn!("Failed to load learned model: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn from_classifier(
        classifier: Box<dyn Classifier>,
        metadata: Option<ModelMetadata>,
    ) -> Self {
        Self {
            classifier: Some(classifier),
            metadata,
            load_error: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            classifier: None,
            metadata: None,
            load_error: Some(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Classifies the sentinel-padded features of `window`.
    pub fn predict(
        &self,
        window: &[Outcome],
        current: DifficultyTier,
        window_size: usize,
    ) -> Result<Decision, ProviderError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(ProviderError::Unavailable)?;

        // Streak and padding depend on the window length the model was fitted on.
        if let Some(meta) = &self.metadata {
            if meta.window_size != window_size {
                return Err(ProviderError::PredictionFailed(format!(
                    "model was trained on windows of {}, session uses {}",
                    meta.window_size, window_size
                )));
            }
        }

        let features = FeatureVector::extract(window, current, Some(window_size));
        let label = classifier.predict(&features.to_array())?;
        let action = TierAction::from_label(label).ok_or_else(|| {
            ProviderError::PredictionFailed(format!("unexpected class label {}", label))
        })?;
        let importances = classifier.global_importances();

        tracing::debug!(
            ?features,
            label,
            "Learned model prediction for tier {}",
            current
        );

        Ok(Decision {
            action,
            source: DecisionSource::Learned,
            next_tier: action.apply(current),
            rationale: format!(
                "{} (learned) — importance={}",
                action.as_str(),
                format_importances(importances.as_deref())
            ),
            importances,
        })
    }
}

fn format_importances(importances: Option<&[f64]>) -> String {
    match importances {
        Some(values) => format!(
            "[{}]",
            values
                .iter()
                .map(|v| format!("{:.3}", v))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        None => "absent".to_string(),
    }
}

impl DecisionProvider for LearnedDecisionProvider {
    fn source(&self) -> DecisionSource {
        DecisionSource::Learned
    }

    fn is_available(&self) -> bool {
        LearnedDecisionProvider::is_available(self)
    }

    fn decide(
        &self,
        history: &AttemptHistory,
        current: DifficultyTier,
        window_size: usize,
    ) -> Result<Decision, ProviderError> {
        self.predict(&outcomes(history.last_n(window_size)), current, window_size)
    }

    fn model_info(&self) -> ModelInfo {
        let importances = self
            .classifier
            .as_ref()
            .and_then(|c| c.global_importances())
            .map(|values| {
                FEATURE_NAMES
                    .iter()
                    .zip(values)
                    .map(|(name, importance)| FeatureImportance {
                        feature: name.to_string(),
                        importance,
                    })
                    .collect()
            })
            .unwrap_or_default();

        ModelInfo {
            available: self.is_available(),
            model: self
                .metadata
                .as_ref()
                .map(|m| m.model.clone())
                .or_else(|| self.classifier.as_ref().map(|c| c.kind().to_string())),
            window_size: self.metadata.as_ref().map(|m| m.window_size),
            features: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
            importances,
            load_error: self.load_error.clone(),
        }
    }
}
