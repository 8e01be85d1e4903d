// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Append-only CSV logs used as classifier training data

use crate::error::Result;
use crate::geometry::{MeshAnalysis, SimplificationLevel};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

pub const SIMPLIFICATION_LOG: &str = "simplification_logs.csv";
pub const ANALYSIS_LOG: &str = "analysis_logs.csv";

/// One row of `simplification_logs.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplificationRow {
    pub mesh_name: String,
    pub vertices: usize,
    pub triangles: usize,
    pub surface_area: f64,
    pub volume: Option<f64>,
    pub watertight: u8,
    pub average_edge_length: f64,
    pub average_triangle_aspect_ratio: f64,
    pub min_curvature: f64,
    pub average_curvature: f64,
    pub max_curvature: f64,
    pub connected_components: usize,
    pub approx_thickness: f64,
    pub simplification_level: SimplificationLevel,
}

impl SimplificationRow {
    pub fn new(mesh_name: &str, analysis: &MeshAnalysis, level: SimplificationLevel) -> Self {
        Self {
            mesh_name: mesh_name.to_string(),
            vertices: analysis.vertices,
            triangles: analysis.triangles,
            surface_area: analysis.surface_area,
            volume: analysis.volume,
            watertight: analysis.watertight as u8,
            average_edge_length: analysis.average_edge_length,
            average_triangle_aspect_ratio: analysis.average_triangle_aspect_ratio,
            min_curvature: analysis.min_curvature,
            average_curvature: analysis.average_curvature,
            max_curvature: analysis.max_curvature,
            connected_components: analysis.connected_components,
            approx_thickness: analysis.approx_thickness,
            simplification_level: level,
        }
    }
}

/// One row of `analysis_logs.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    pub timestamp: String,
    pub mesh_name: String,
    pub vertices: usize,
    pub triangles: usize,
    pub surface_area: f64,
    pub volume: Option<f64>,
    pub convex_hull_volume: f64,
    pub watertight: u8,
    pub average_edge_length: f64,
    pub average_triangle_aspect_ratio: f64,
    pub non_manifold_edge_count: usize,
    pub average_curvature: f64,
    pub max_curvature: f64,
    pub min_curvature: f64,
    pub connected_components: usize,
    pub sharp_edge_count: usize,
    pub approx_thickness: f64,
}

impl AnalysisRow {
    pub fn new(mesh_name: &str, analysis: &MeshAnalysis, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            mesh_name: mesh_name.to_string(),
            vertices: analysis.vertices,
            triangles: analysis.triangles,
            surface_area: analysis.surface_area,
            volume: analysis.volume,
            convex_hull_volume: analysis.convex_hull_volume,
            watertight: analysis.watertight as u8,
            average_edge_length: analysis.average_edge_length,
            average_triangle_aspect_ratio: analysis.average_triangle_aspect_ratio,
            non_manifold_edge_count: analysis.non_manifold_edge_count,
            average_curvature: analysis.average_curvature,
            max_curvature: analysis.max_curvature,
            min_curvature: analysis.min_curvature,
            connected_components: analysis.connected_components,
            sharp_edge_count: analysis.sharp_edge_count,
            approx_thickness: analysis.approx_thickness,
        }
    }
}

/// Append a serializable row, writing the header only when the file is new
pub fn append_row<T: Serialize>(path: &Path, row: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;

    log::debug!("appended row to {}", path.display());
    Ok(())
}

/// Training rows written after each simplification
pub struct SimplificationLog;

impl SimplificationLog {
    pub fn append(
        path: &Path,
        mesh_name: &str,
        analysis: &MeshAnalysis,
        level: SimplificationLevel,
    ) -> Result<()> {
        append_row(path, &SimplificationRow::new(mesh_name, analysis, level))
    }
}

/// Rows written after each analysis
pub struct AnalysisLog;

impl AnalysisLog {
    pub fn append(path: &Path, mesh_name: &str, analysis: &MeshAnalysis) -> Result<()> {
        append_row(path, &AnalysisRow::new(mesh_name, analysis, Utc::now()))
    }
}
