// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Classifier input features

use crate::geometry::MeshAnalysis;
use std::ops::Index;

pub const FEATURE_COUNT: usize = 12;

/// Column order the classifier was trained with
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "average_edge_length",
    "min_curvature",
    "average_triangle_aspect_ratio",
    "average_curvature",
    "surface_area",
    "volume",
    "connected_components",
    "triangles",
    "max_curvature",
    "vertices",
    "approx_thickness",
    "watertight",
];

/// One classifier input row in `FEATURE_ORDER`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Missing volume reads as 0 and watertight as 1.0 / 0.0
    pub fn from_analysis(analysis: &MeshAnalysis) -> Self {
        Self([
            analysis.average_edge_length,
            analysis.min_curvature,
            analysis.average_triangle_aspect_ratio,
            analysis.average_curvature,
            analysis.surface_area,
            analysis.volume_or_zero(),
            analysis.connected_components as f64,
            analysis.triangles as f64,
            analysis.max_curvature,
            analysis.vertices as f64,
            analysis.approx_thickness,
            if analysis.watertight { 1.0 } else { 0.0 },
        ])
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_ORDER
            .iter()
            .position(|&n| n == name)
            .map(|i| self.0[i])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}
