// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Simplification-level suggestion from a trained model

mod classifier;
mod features;

pub use classifier::{load_classifier, LevelClassifier, Node, TreeEnsemble};
pub use features::{FeatureVector, FEATURE_COUNT, FEATURE_ORDER};
