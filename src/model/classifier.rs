// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Tree-ensemble classifier that suggests a simplification level

use super::features::{FeatureVector, FEATURE_COUNT, FEATURE_ORDER};
use crate::error::{Result, ScanError};
use crate::geometry::SimplificationLevel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Anything that maps a feature row to a level
pub trait LevelClassifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<SimplificationLevel>;
}

/// Decision tree node
///
/// Trees are stored as flat arrays with node 0 as the root. Children always
/// sit after their parent, which is how pre-order exporters lay them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
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

/// Ensemble of decision trees exported as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub trees: Vec<Vec<Node>>,
    #[serde(skip)]
    levels: Vec<SimplificationLevel>,
}

impl TreeEnsemble {
    pub fn from_json(text: &str) -> Result<Self> {
        let mut ensemble: TreeEnsemble = serde_json::from_str(text)
            .map_err(|e| ScanError::Model(format!("malformed model JSON: {}", e)))?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&mut self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(ScanError::Model("no classes".into()));
        }
        self.levels = self
            .classes
            .iter()
            .map(|c| c.parse::<SimplificationLevel>())
            .collect::<Result<_>>()
            .map_err(|e| ScanError::Model(e.to_string()))?;

        if let Some(names) = &self.feature_names {
            if names.len() != FEATURE_COUNT || names.iter().zip(FEATURE_ORDER).any(|(a, b)| a != b) {
                return Err(ScanError::Model(format!(
                    "feature_names must be {:?}",
                    FEATURE_ORDER
                )));
            }
        }

        if self.trees.is_empty() {
            return Err(ScanError::Model("no trees".into()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.is_empty() {
                return Err(ScanError::Model(format!("tree {} is empty", t)));
            }
            for (i, node) in tree.iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= FEATURE_COUNT {
                            return Err(ScanError::Model(format!(
                                "tree {} node {}: feature {} out of range",
                                t, i, feature
                            )));
                        }
                        for &child in [left, right] {
                            if child <= i || child >= tree.len() {
                                return Err(ScanError::Model(format!(
                                    "tree {} node {}: child {} out of range",
                                    t, i, child
                                )));
                            }
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return Err(ScanError::Model(format!(
                                "tree {} node {}: leaf has {} scores for {} classes",
                                t,
                                i,
                                value.len(),
                                self.classes.len()
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn leaf<'a>(tree: &'a [Node], features: &FeatureVector) -> &'a [f64] {
        let mut index = 0;
        loop {
            match &tree[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { value } => return value,
            }
        }
    }

    /// Per-class score: the sum over trees of each leaf's normalised scores
    pub fn scores(&self, features: &FeatureVector) -> Vec<f64> {
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = Self::leaf(tree, features);
            let sum: f64 = leaf.iter().sum();
            for (total, &v) in totals.iter_mut().zip(leaf) {
                *total += if sum > 0.0 { v / sum } else { v };
            }
        }
        totals
    }
}

impl LevelClassifier for TreeEnsemble {
    fn predict(&self, features: &FeatureVector) -> Result<SimplificationLevel> {
        let scores = self.scores(features);
        let best = scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((i, s)),
            })
            .map(|(i, _)| i)
            .ok_or_else(|| ScanError::Model("no scores".into()))?;
        if self.levels.len() != self.classes.len() {
            return Err(ScanError::Model("ensemble was not validated".into()));
        }
        Ok(self.levels[best])
    }
}

/// Load the model if the file exists
pub fn load_classifier(path: &Path) -> Result<Option<TreeEnsemble>> {
    if !path.exists() {
        log::debug!("no model at {}", path.display());
        return Ok(None);
    }
    let model = TreeEnsemble::from_file(path)?;
    log::info!(
        "loaded model from {} ({} trees)",
        path.display(),
        model.trees.len()
    );
    Ok(Some(model))
}
