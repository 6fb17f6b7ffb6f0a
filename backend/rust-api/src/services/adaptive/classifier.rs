use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::TierAction;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },
    #[error("feature {0} is not a finite number")]
    NonFiniteFeature(usize),
    #[error("node {0} is out of range")]
    InvalidNode(i64),
    #[error("node {node} splits on unknown feature {feature}")]
    InvalidFeature { node: usize, feature: i64 },
    #[error("tree walk did not reach a leaf")]
    Cycle,
    #[error("leaf {0} has no class scores")]
    EmptyLeaf(usize),
    #[error("class label {0} is outside -1..=1")]
    UnknownClass(i64),
    #[error("malformed model: {0}")]
    Malformed(String),
}

/// Opaque trained model. Only this contract is assumed of it, never a
/// particular model family.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Categorical prediction over {-1, 0, 1} for one feature row.
    fn predict(&self, features: &[f64]) -> Result<i8, ClassifierError>;

    /// Classifier-global feature weights, if the model family has them.
    fn global_importances(&self) -> Option<Vec<f64>>;

    fn kind(&self) -> &str;
}

/// Training-time description shipped next to the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model: String,
    pub window_size: usize,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Binary decision tree in flattened array form.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Otherwise the walk goes
/// left when `x[feature[i]] <= threshold[i]`. A leaf predicts the class with
/// the highest score in `value[i]`, ties going to the earlier class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
}

const LEAF: i64 = -1;

impl DecisionTreeModel {
    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let nodes = self.children_left.len();
        if nodes == 0 {
            return Err(ClassifierError::Malformed("tree has no nodes".to_string()));
        }
        if self.children_right.len() != nodes
            || self.feature.len() != nodes
            || self.threshold.len() != nodes
            || self.value.len() != nodes
        {
            return Err(ClassifierError::Malformed(
                "node arrays have different lengths".to_string(),
            ));
        }
        if self.classes.is_empty() {
            return Err(ClassifierError::Malformed("no classes".to_string()));
        }
        if let Some(bad) = self
            .classes
            .iter()
            .find(|c| !(-1..=1).contains(*c))
        {
            return Err(ClassifierError::UnknownClass(*bad));
        }
        if let Some(importances) = &self.feature_importances {
            if importances.len() != self.n_features {
                return Err(ClassifierError::Malformed(format!(
                    "{} importances for {} features",
                    importances.len(),
                    self.n_features
                )));
            }
        }
        Ok(())
    }

    fn node_index(&self, raw: i64) -> Result<usize, ClassifierError> {
        usize::try_from(raw)
            .ok()
            .filter(|i| *i < self.children_left.len())
            .ok_or(ClassifierError::InvalidNode(raw))
    }

    fn leaf_class(&self, node: usize) -> Result<i8, ClassifierError> {
        let scores = self
            .value
            .get(node)
            .ok_or(ClassifierError::InvalidNode(node as i64))?;
        if scores.is_empty() {
            return Err(ClassifierError::EmptyLeaf(node));
        }
        let mut best = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }
        let class = *self
            .classes
            .get(best)
            .ok_or(ClassifierError::EmptyLeaf(node))?;
        i8::try_from(class)
            .ok()
            .filter(|c| TierAction::from_label(*c).is_some())
            .ok_or(ClassifierError::UnknownClass(class))
    }
}

impl Classifier for DecisionTreeModel {
    fn predict(&self, features: &[f64]) -> Result<i8, ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::FeatureCount {
                expected: self.n_features,
                got: features.len(),
            });
        }
        if let Some(i) = features.iter().position(|x| !x.is_finite()) {
            return Err(ClassifierError::NonFiniteFeature(i));
        }

        let mut node = 0usize;
        let missing = |node: usize| ClassifierError::InvalidNode(node as i64);
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.children_left.len() {
            let left = *self.children_left.get(node).ok_or_else(|| missing(node))?;
            if left == LEAF {
                return self.leaf_class(node);
            }
            let raw_feature = *self.feature.get(node).ok_or_else(|| missing(node))?;
            let threshold = *self.threshold.get(node).ok_or_else(|| missing(node))?;
            let x = usize::try_from(raw_feature)
                .ok()
                .and_then(|f| features.get(f))
                .ok_or(ClassifierError::InvalidFeature {
                    node,
                    feature: raw_feature,
                })?;
            node = if *x <= threshold {
                self.node_index(left)?
            } else {
                let right = *self.children_right.get(node).ok_or_else(|| missing(node))?;
                self.node_index(right)?
            };
        }
        Err(ClassifierError::Cycle)
    }

    fn global_importances(&self) -> Option<Vec<f64>> {
        self.feature_importances.clone()
    }

    fn kind(&self) -> &str {
        "DecisionTreeClassifier"
    }
}
