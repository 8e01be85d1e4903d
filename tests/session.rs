// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! End-to-end session tests: load, analyze, suggest, simplify, report, export

use anyhow::Result;
use scanalyzer::config::ScanConfig;
use scanalyzer::geometry::{Primitive, SimplificationLevel};
use scanalyzer::io::{self, MeshFormat, Report};
use scanalyzer::Session;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Mild below 1000 triangles, Aggressive above
const TRIANGLE_MODEL: &str = r#"{
    "classes": ["Mild", "Medium", "Aggressive"],
    "feature_names": [
        "average_edge_length", "min_curvature", "average_triangle_aspect_ratio",
        "average_curvature", "surface_area", "volume", "connected_components",
        "triangles", "max_curvature", "vertices", "approx_thickness", "watertight"
    ],
    "trees": [[
        {"feature": 7, "threshold": 1000.0, "left": 1, "right": 2},
        {"value": [10.0, 0.0, 0.0]},
        {"value": [0.0, 1.0, 9.0]}
    ]]
}"#;

fn workspace(model: Option<&str>) -> Result<(TempDir, ScanConfig)> {
    let dir = tempdir()?;
    let model_path = dir.path().join("model").join("simplification_model.json");
    if let Some(model) = model {
        std::fs::create_dir_all(model_path.parent().unwrap())?;
        std::fs::write(&model_path, model)?;
    }
    let config = ScanConfig {
        model_path,
        data_dir: dir.path().join("data"),
        report_path: dir.path().join("report.json"),
        display_triangle_cap: 500,
        ..ScanConfig::default()
    };
    Ok((dir, config))
}

fn write_sphere(dir: &Path, stacks: u32, slices: u32) -> Result<std::path::PathBuf> {
    let path = dir.join("scan.sphere.stl");
    io::export_mesh(&Primitive::sphere(4.0, stacks, slices).to_mesh(), &path)?;
    Ok(path)
}

#[test]
fn test_full_pipeline_with_model() -> Result<()> {
    let (dir, config) = workspace(Some(TRIANGLE_MODEL))?;
    let input = write_sphere(dir.path(), 24, 48)?;

    let mut session = Session::new(config.clone());
    assert!(session.has_classifier());

    session.load_path(&input)?;
    assert_eq!(session.mesh_name(), Some("scan"));

    let analysis = session.analyze()?.clone();
    assert_eq!(analysis.triangles, 2208);

    let level = session.suggest_level()?;
    assert_eq!(level, Some(SimplificationLevel::Aggressive));

    let outcome = session.simplify(SimplificationLevel::Aggressive)?;
    assert_eq!(outcome.target_triangles, 552);
    assert!(outcome.final_triangles <= 552);

    // Two analyses (before and after simplifying) and one simplification
    let analysis_log = std::fs::read_to_string(config.analysis_log_path())?;
    assert_eq!(analysis_log.lines().count(), 3);
    let simplification_log = std::fs::read_to_string(config.simplification_log_path())?;
    let rows: Vec<&str> = simplification_log.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with(&format!("scan,{},{},", outcome.final_vertices, outcome.final_triangles)));
    assert!(rows[1].ends_with(",Aggressive"));

    let written = session.write_report(None)?;
    assert_eq!(written, config.report_path);
    let report = Report::read(&written)?;
    assert_eq!(report.mesh_name, "scan");
    assert_eq!(report.suggested_level, Some(SimplificationLevel::Aggressive));
    assert_eq!(report.simplification_level, Some(SimplificationLevel::Aggressive));
    assert_eq!(report.analysis.triangles, outcome.final_triangles);
    assert_eq!(
        report.source_sha256,
        Some(io::digest_bytes(&std::fs::read(&input)?))
    );

    let simplified = dir.path().join("out").join("simplified.glb");
    std::fs::create_dir_all(simplified.parent().unwrap())?;
    session.export_mesh(&simplified)?;
    assert!(simplified.exists());
    Ok(())
}

#[test]
fn test_without_model_there_is_no_suggestion() -> Result<()> {
    let (dir, config) = workspace(None)?;
    let input = write_sphere(dir.path(), 8, 16)?;

    let mut session = Session::new(config);
    assert!(!session.has_classifier());
    session.load_path(&input)?;
    assert_eq!(session.suggest_level()?, None);
    assert!(session.analysis().is_some());
    Ok(())
}

#[test]
fn test_broken_model_is_ignored() -> Result<()> {
    let (dir, config) = workspace(Some("{ not json"))?;
    let input = write_sphere(dir.path(), 8, 16)?;

    let mut session = Session::new(config);
    assert!(!session.has_classifier());
    session.load_path(&input)?;
    assert_eq!(session.suggest_level()?, None);
    Ok(())
}

#[test]
fn test_preview_respects_display_cap() -> Result<()> {
    let (dir, config) = workspace(None)?;
    let input = write_sphere(dir.path(), 24, 48)?;

    let mut session = Session::new(config);
    let bytes = std::fs::read(&input)?;
    session.load_upload("upload.stl", &bytes, MeshFormat::Stl)?;

    let preview = dir.path().join("preview.glb");
    let triangles = session.export_preview(&preview)?;
    assert!(triangles <= 500);
    assert!(preview.exists());

    // The session mesh itself is untouched
    assert_eq!(session.mesh().map(|m| m.triangle_count()), Some(2208));
    Ok(())
}

#[test]
fn test_logging_can_be_disabled() -> Result<()> {
    let (dir, mut config) = workspace(None)?;
    config.log_analysis = false;
    config.log_simplification = false;
    let input = write_sphere(dir.path(), 12, 24)?;

    let mut session = Session::new(config.clone());
    session.load_path(&input)?;
    session.analyze()?;
    session.simplify(SimplificationLevel::Mild)?;

    assert!(!config.analysis_log_path().exists());
    assert!(!config.simplification_log_path().exists());
    Ok(())
}
