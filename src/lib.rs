// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Scanalyzer
//!
//! Loads triangle meshes from 3D scans (PLY, OBJ, STL), measures their
//! geometry and topology, suggests a simplification level from a trained
//! tree-ensemble model, simplifies them by quadric edge collapse, and writes
//! JSON reports, CSV training logs and STL/glTF exports.

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod model;
pub mod session;

pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use geometry::{analyze, simplify, Mesh, MeshAnalysis, Primitive, SimplificationLevel};
pub use io::{load_mesh, load_mesh_bytes, MeshFormat, Report};
pub use session::Session;
