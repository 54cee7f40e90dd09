//! Pre-trained classifier artifacts
//!
//! The pipeline only depends on the `Classifier` trait. `ModelArtifact` is
//! the persisted form of the trained model, exported as JSON and tagged by
//! `kind`:
//!
//! - `linear`: one coefficient row and intercept per class
//! - `tree_ensemble`: decision trees whose leaf distributions are averaged
//! - `stacking`: base models whose class probabilities feed a final model
//!
//! Global invariants enforced:
//! - Deterministic output for a fixed artifact and input
//! - Argmax ties resolve to the lowest class index
//! - Artifacts are immutable once loaded

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Narrow interface to a trained model: scaled vector in, class code out
pub trait Classifier: Send + Sync {
    /// Number of inputs the model was trained on
    fn n_features(&self) -> usize;

    /// Predict a class code for one scaled feature vector
    fn predict(&self, features: &[f64]) -> Result<i64>;
}

/// Persisted trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
    Stacking(StackingModel),
}

/// Multinomial linear model (softmax over per-class logits)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<i64>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

/// Averaged ensemble of decision trees (soft voting)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub classes: Vec<i64>,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

/// Tree node; a sample goes left when `x[feature] <= threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// Stacked generalization: base estimators feed a final estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingModel {
    pub estimators: Vec<ModelArtifact>,
    pub final_estimator: Box<ModelArtifact>,
    /// Append the original features to the base probabilities
    #[serde(default)]
    pub passthrough: bool,
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::INFINITY {
        // overflowed logits share all the mass
        let n = logits.iter().filter(|l| **l == f64::INFINITY).count() as f64;
        return logits
            .iter()
            .map(|l| if *l == f64::INFINITY { 1.0 / n } else { 0.0 })
            .collect();
    }
    if max == f64::NEG_INFINITY {
        return vec![1.0 / logits.len() as f64; logits.len()];
    }
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn check_classes(classes: &[i64]) -> std::result::Result<(), String> {
    if classes.is_empty() {
        return Err("model declares no classes".to_string());
    }
    for (i, c) in classes.iter().enumerate() {
        if classes[..i].contains(c) {
            return Err(format!("duplicate class code {}", c));
        }
    }
    Ok(())
}

impl LinearModel {
    fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_classes(&self.classes)?;
        if self.coef.len() != self.classes.len() || self.intercept.len() != self.classes.len() {
            return Err(format!(
                "linear model has {} classes, {} coefficient rows and {} intercepts",
                self.classes.len(),
                self.coef.len(),
                self.intercept.len()
            ));
        }
        let width = self.n_features();
        if width == 0 {
            return Err("linear model has empty coefficient rows".to_string());
        }
        if let Some(row) = self.coef.iter().position(|r| r.len() != width) {
            return Err(format!(
                "coefficient row {} has {} entries, expected {}",
                row,
                self.coef[row].len(),
                width
            ));
        }
        Ok(())
    }

    fn logits(&self, x: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect()
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        softmax(&self.logits(x))
    }
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", i, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", i));
                    }
                    // children must come after their parent, which also rules out cycles
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child index {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} class weights, expected {}",
                            i,
                            value.len(),
                            n_classes
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("leaf {} has a negative or non-finite weight", i));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("leaf {} has no weight", i));
                    }
                }
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf `x` falls into
    fn leaf_distribution(&self, x: &[f64]) -> Vec<f64> {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    return value.iter().map(|v| v / total).collect();
                }
            }
        }
    }
}

impl TreeEnsemble {
    fn validate(&self) -> std::result::Result<(), String> {
        check_classes(&self.classes)?;
        if self.n_features == 0 {
            return Err("tree ensemble declares zero features".to_string());
        }
        if self.trees.is_empty() {
            return Err("tree ensemble has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf_distribution(x)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.into_iter().map(|a| a / n).collect()
    }
}

impl StackingModel {
    fn meta_width(&self) -> usize {
        let base: usize = self.estimators.iter().map(|e| e.classes().len()).sum();
        if self.passthrough {
            base + self.n_features()
        } else {
            base
        }
    }

    fn n_features(&self) -> usize {
        self.estimators.first().map(|e| e.n_features()).unwrap_or(0)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.estimators.is_empty() {
            return Err("stacking model has no base estimators".to_string());
        }
        let width = self.n_features();
        for (i, estimator) in self.estimators.iter().enumerate() {
            estimator
                .validate()
                .map_err(|e| format!("estimator {}: {}", i, e))?;
            if estimator.n_features() != width {
                return Err(format!(
                    "estimator {} expects {} features, estimator 0 expects {}",
                    i,
                    estimator.n_features(),
                    width
                ));
            }
        }
        self.final_estimator
            .validate()
            .map_err(|e| format!("final estimator: {}", e))?;
        if self.final_estimator.n_features() != self.meta_width() {
            return Err(format!(
                "final estimator expects {} inputs, base estimators produce {}",
                self.final_estimator.n_features(),
                self.meta_width()
            ));
        }
        Ok(())
    }

    fn meta_features(&self, x: &[f64]) -> Vec<f64> {
        let mut meta = Vec::with_capacity(self.meta_width());
        for estimator in &self.estimators {
            meta.extend(estimator.predict_proba_unchecked(x));
        }
        if self.passthrough {
            meta.extend_from_slice(x);
        }
        meta
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        self.final_estimator.predict_proba_unchecked(&self.meta_features(x))
    }
}

impl ModelArtifact {
    /// Load and validate a model artifact
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RiskError::artifact(path, format!("failed to read: {}", e)))?;
        let model = ModelArtifact::from_json(&content)
            .map_err(|message| RiskError::artifact(path, message))?;
        tracing::debug!(
            path = %path.display(),
            kind = model.kind(),
            features = model.n_features(),
            classes = model.classes().len(),
            "loaded classifier"
        );
        Ok(model)
    }

    /// Parse and validate a model from JSON text
    pub fn from_json(content: &str) -> std::result::Result<Self, String> {
        let model: ModelArtifact =
            serde_json::from_str(content).map_err(|e| format!("failed to parse: {}", e))?;
        model.validate()?;
        Ok(model)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Linear(_) => "linear",
            ModelArtifact::TreeEnsemble(_) => "tree_ensemble",
            ModelArtifact::Stacking(_) => "stacking",
        }
    }

    /// Class codes in output order
    pub fn classes(&self) -> &[i64] {
        match self {
            ModelArtifact::Linear(m) => &m.classes,
            ModelArtifact::TreeEnsemble(m) => &m.classes,
            ModelArtifact::Stacking(m) => m.final_estimator.classes(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            ModelArtifact::Linear(m) => m.validate(),
            ModelArtifact::TreeEnsemble(m) => m.validate(),
            ModelArtifact::Stacking(m) => m.validate(),
        }
    }

    /// Class probabilities in `classes()` order
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        self.check_input(features)?;
        Ok(self.predict_proba_unchecked(features))
    }

    /// Per-class scores the prediction is the argmax of: raw logits for a
    /// linear model, class probabilities otherwise
    fn decision_scores(&self, x: &[f64]) -> Vec<f64> {
        match self {
            ModelArtifact::Linear(m) => m.logits(x),
            ModelArtifact::TreeEnsemble(m) => m.predict_proba(x),
            ModelArtifact::Stacking(m) => m.final_estimator.decision_scores(&m.meta_features(x)),
        }
    }

    fn predict_proba_unchecked(&self, x: &[f64]) -> Vec<f64> {
        match self {
            ModelArtifact::Linear(m) => m.predict_proba(x),
            ModelArtifact::TreeEnsemble(m) => m.predict_proba(x),
            ModelArtifact::Stacking(m) => m.predict_proba(x),
        }
    }

    fn check_input(&self, features: &[f64]) -> Result<()> {
        if features.len() != self.n_features() {
            return Err(RiskError::Inference(format!(
                "{} model expects {} features, got {}",
                self.kind(),
                self.n_features(),
                features.len()
            )));
        }
        Ok(())
    }
}

impl Classifier for ModelArtifact {
    fn n_features(&self) -> usize {
        match self {
            ModelArtifact::Linear(m) => m.n_features(),
            ModelArtifact::TreeEnsemble(m) => m.n_features,
            ModelArtifact::Stacking(m) => m.n_features(),
        }
    }

    fn predict(&self, features: &[f64]) -> Result<i64> {
        self.check_input(features)?;
        let scores = self.decision_scores(features);
        if scores.iter().any(|s| s.is_nan()) {
            return Err(RiskError::Inference("model produced NaN scores".to_string()));
        }
        Ok(self.classes()[argmax(&scores)])
    }
}
