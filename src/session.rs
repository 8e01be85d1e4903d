// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! One load / analyze / simplify / export pass over a single mesh

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::geometry::{
    self, preview_mesh, AnalysisOptions, Mesh, MeshAnalysis, SimplificationLevel,
};
use crate::io::{self, AnalysisLog, MeshFormat, Report, SimplificationLog};
use crate::model::{load_classifier, FeatureVector, LevelClassifier};
use std::path::{Path, PathBuf};

/// Full analysis, or the reduced fallback with a warning when it fails
pub fn analyze_or_fallback(mesh: &Mesh, options: &AnalysisOptions) -> MeshAnalysis {
    match geometry::analyze(mesh, options) {
        Ok(analysis) => analysis,
        Err(e) => {
            log::warn!("full analysis failed ({}), using basic metrics", e);
            MeshAnalysis::fallback(mesh)
        }
    }
}

/// Counts reported after a simplification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplificationOutcome {
    pub level: SimplificationLevel,
    pub original_triangles: usize,
    pub target_triangles: usize,
    pub final_triangles: usize,
    pub final_vertices: usize,
}

/// Holds the current mesh and everything derived from it
pub struct Session {
    config: ScanConfig,
    classifier: Option<Box<dyn LevelClassifier>>,
    mesh: Option<Mesh>,
    mesh_name: Option<String>,
    source_sha256: Option<String>,
    analysis: Option<MeshAnalysis>,
    suggested_level: Option<SimplificationLevel>,
    simplification_level: Option<SimplificationLevel>,
}

impl Session {
    /// Create a session, loading the model named in the config when present.
    ///
    /// A model that fails to load is reported and the session carries on
    /// without suggestions.
    pub fn new(config: ScanConfig) -> Self {
        let classifier = match load_classifier(&config.model_path) {
            Ok(Some(model)) => Some(Box::new(model) as Box<dyn LevelClassifier>),
            Ok(None) => None,
            Err(e) => {
                log::warn!(
                    "could not load model {}: {}",
                    config.model_path.display(),
                    e
                );
                None
            }
        };
        Self::with_classifier(config, classifier)
    }

    pub fn with_classifier(
        config: ScanConfig,
        classifier: Option<Box<dyn LevelClassifier>>,
    ) -> Self {
        Self {
            config,
            classifier,
            mesh: None,
            mesh_name: None,
            source_sha256: None,
            analysis: None,
            suggested_level: None,
            simplification_level: None,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn mesh_name(&self) -> Option<&str> {
        self.mesh_name.as_deref()
    }

    pub fn analysis(&self) -> Option<&MeshAnalysis> {
        self.analysis.as_ref()
    }

    pub fn suggested_level(&self) -> Option<SimplificationLevel> {
        self.suggested_level
    }

    pub fn simplification_level(&self) -> Option<SimplificationLevel> {
        self.simplification_level
    }

    fn replace_mesh(&mut self, mesh: Mesh, name: String, digest: String) {
        self.mesh = Some(mesh);
        self.mesh_name = Some(name);
        self.source_sha256 = Some(digest);
        self.analysis = None;
        self.suggested_level = None;
        self.simplification_level = None;
    }

    /// Load a mesh file from disk
    pub fn load_path(&mut self, path: &Path) -> Result<&Mesh> {
        let mesh = io::load_mesh(path)?;
        // Second pass over the file, streamed through the hasher
        let digest = io::digest_file(path)?;
        self.replace_mesh(mesh, io::mesh_name(path), digest);
        self.mesh.as_ref().ok_or(ScanError::NoMesh)
    }

    /// Load uploaded bytes; `file_name` only names the mesh
    pub fn load_upload(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        format: MeshFormat,
    ) -> Result<&Mesh> {
        let mesh = io::load_mesh_bytes(bytes, format)?;
        self.replace_mesh(mesh, io::mesh_name(Path::new(file_name)), io::digest_bytes(bytes));
        self.mesh.as_ref().ok_or(ScanError::NoMesh)
    }

    fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            sharp_angle_degrees: self.config.sharp_angle_degrees,
        }
    }

    fn name(&self) -> &str {
        self.mesh_name.as_deref().unwrap_or("mesh")
    }

    /// Analyze the current mesh and append the analysis log row
    pub fn analyze(&mut self) -> Result<&MeshAnalysis> {
        let mesh = self.mesh.as_ref().ok_or(ScanError::NoMesh)?;
        let analysis = analyze_or_fallback(mesh, &self.analysis_options());
        log::info!(
            "analyzed {}: {} triangles, watertight={}",
            self.name(),
            analysis.triangles,
            analysis.watertight
        );
        self.analysis = Some(analysis);

        self.log_analysis()?;
        self.analysis.as_ref().ok_or(ScanError::NoMesh)
    }

    fn log_analysis(&self) -> Result<()> {
        match &self.analysis {
            Some(analysis) if self.config.log_analysis => {
                AnalysisLog::append(&self.config.analysis_log_path(), self.name(), analysis)
            }
            _ => Ok(()),
        }
    }

    /// Ask the model for a level; `None` without a model or on model failure
    pub fn suggest_level(&mut self) -> Result<Option<SimplificationLevel>> {
        if self.analysis.is_none() {
            self.analyze()?;
        }
        let (Some(classifier), Some(analysis)) = (&self.classifier, &self.analysis) else {
            log::debug!("no model loaded, skipping suggestion");
            return Ok(None);
        };

        let features = FeatureVector::from_analysis(analysis);
        self.suggested_level = match classifier.predict(&features) {
            Ok(level) => {
                log::info!("suggested level for {}: {}", self.name(), level);
                Some(level)
            }
            Err(e) => {
                log::warn!("could not suggest a simplification level: {}", e);
                None
            }
        };
        Ok(self.suggested_level)
    }

    /// Simplify the current mesh in place, re-analyze it and log the result
    pub fn simplify(&mut self, level: SimplificationLevel) -> Result<SimplificationOutcome> {
        let mesh = self.mesh.as_ref().ok_or(ScanError::NoMesh)?;
        let result = geometry::simplify(mesh, level);

        let outcome = SimplificationOutcome {
            level,
            original_triangles: result.original_triangles,
            target_triangles: result.target_triangles,
            final_triangles: result.mesh.triangle_count(),
            final_vertices: result.mesh.vertex_count(),
        };
        let analysis = analyze_or_fallback(&result.mesh, &self.analysis_options());

        // Mesh, analysis and level are committed together before any log write
        self.mesh = Some(result.mesh);
        self.analysis = Some(analysis);
        self.simplification_level = Some(level);

        self.log_analysis()?;
        if self.config.log_simplification {
            if let Some(analysis) = &self.analysis {
                SimplificationLog::append(
                    &self.config.simplification_log_path(),
                    self.name(),
                    analysis,
                    level,
                )?;
            }
        }

        log::info!(
            "simplified {} ({}): {} -> {} triangles",
            self.name(),
            level,
            outcome.original_triangles,
            outcome.final_triangles
        );
        Ok(outcome)
    }

    /// Build the report for the latest analysis
    pub fn report(&self) -> Result<Report> {
        let analysis = self.analysis.clone().ok_or(ScanError::NoMesh)?;
        let mut report = Report::new(self.name(), analysis);
        report.source_sha256 = self.source_sha256.clone();
        report.suggested_level = self.suggested_level;
        report.simplification_level = self.simplification_level;
        Ok(report)
    }

    /// Write the report, to the configured path when none is given
    pub fn write_report(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.report_path.clone());
        self.report()?.write(&path)?;
        Ok(path)
    }

    pub fn export_mesh(&self, path: &Path) -> Result<()> {
        let mesh = self.mesh.as_ref().ok_or(ScanError::NoMesh)?;
        io::export_mesh(mesh, path)
    }

    /// Export a copy decimated to the display cap
    pub fn export_preview(&self, path: &Path) -> Result<usize> {
        let mesh = self.mesh.as_ref().ok_or(ScanError::NoMesh)?;
        let preview = preview_mesh(mesh, self.config.display_triangle_cap);
        io::export_mesh(&preview, path)?;
        Ok(preview.triangle_count())
    }
}
