// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! I/O module - loading, reports, logs and exports

pub mod csv_log;
mod export;
mod export_gltf;
mod loader;
mod report;

pub use csv_log::{AnalysisLog, SimplificationLog, ANALYSIS_LOG, SIMPLIFICATION_LOG};
pub use export::{export_mesh, export_stl_ascii, export_stl_binary};
pub use export_gltf::export as export_gltf;
pub use loader::{
    digest_bytes, digest_file, is_supported, load_mesh, load_mesh_bytes, mesh_name, MeshFormat,
};
pub use report::Report;
