// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Error types shared across the library

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading, analyzing, simplifying or reporting on a mesh
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported mesh format: {0} (expected ply, obj or stl)")]
    UnsupportedFormat(String),

    #[error("failed to parse {format} file {path:?}: {message}")]
    Parse {
        format: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("file loaded but contains no triangles: {0:?}")]
    NoTriangles(PathBuf),

    #[error("triangle {triangle} references vertex {index} but mesh has {vertex_count} vertices")]
    InvalidIndex {
        triangle: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("mesh has no vertices or no triangles")]
    EmptyMesh,

    #[error("no mesh loaded")]
    NoMesh,

    #[error("invalid model: {0}")]
    Model(String),

    #[error("unknown simplification level: {0}")]
    UnknownLevel(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export failed: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
