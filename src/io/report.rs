// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! JSON analysis report

use crate::error::Result;
use crate::geometry::{MeshAnalysis, SimplificationLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Downloadable report: the analysis fields at top level plus provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub mesh_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub suggested_level: Option<SimplificationLevel>,
    pub simplification_level: Option<SimplificationLevel>,
    #[serde(flatten)]
    pub analysis: MeshAnalysis,
}

impl Report {
    pub fn new(mesh_name: impl Into<String>, analysis: MeshAnalysis) -> Self {
        Self {
            mesh_name: mesh_name.into(),
            source_sha256: None,
            generated_at: Utc::now(),
            suggested_level: None,
            simplification_level: None,
            analysis,
        }
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut file, self)?;
        writeln!(file)?;
        file.flush()?;
        log::info!("report written to {}", path.display());
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
