// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Geometry module - mesh representation, analysis and simplification

mod analytics;
mod bbox;
mod mesh;
mod primitives;
pub mod simplify;
pub mod topology;

pub use analytics::{
    analyze, convex_hull_volume, triangle_aspect_ratio, AnalysisOptions, BoundsReport,
    MeshAnalysis,
};
pub use bbox::BoundingBox;
pub use mesh::{Mesh, Triangle, Vertex};
pub use primitives::Primitive;
pub use simplify::{
    decimate, preview_mesh, simplify, target_triangles, SimplificationLevel,
    SimplificationResult,
};
