// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Simplification level and decimation tests

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::Vector3;
use scanalyzer::geometry::{
    analyze, simplify, target_triangles, AnalysisOptions, Primitive, SimplificationLevel,
};
use scanalyzer::io::{load_mesh, MeshFormat};
use std::fmt::Write as _;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_targets_follow_level_factors() {
    assert_eq!(target_triangles(SimplificationLevel::Mild, 1000), 750);
    assert_eq!(target_triangles(SimplificationLevel::Medium, 1001), 500);
    assert_eq!(target_triangles(SimplificationLevel::Aggressive, 1000), 250);
    assert_eq!(target_triangles(SimplificationLevel::Aggressive, 300), 100);
    assert_eq!(target_triangles(SimplificationLevel::Mild, 12), 100);
}

#[test]
fn test_levels_parse_case_insensitively() {
    assert_eq!("mild".parse::<SimplificationLevel>().unwrap(), SimplificationLevel::Mild);
    assert_eq!(" AGGRESSIVE ".parse::<SimplificationLevel>().unwrap(), SimplificationLevel::Aggressive);
    assert!("extreme".parse::<SimplificationLevel>().is_err());
    assert_eq!(SimplificationLevel::Medium.to_string(), "Medium");
}

#[test]
fn test_sphere_levels() -> Result<()> {
    let mesh = Primitive::sphere(5.0, 24, 48).to_mesh();
    let original = analyze(&mesh, &AnalysisOptions::default())?;
    assert_eq!(original.triangles, 2 * 48 * 23);

    let mut previous = original.triangles;
    for level in SimplificationLevel::ALL {
        let result = simplify(&mesh, level);
        let stats = analyze(&result.mesh, &AnalysisOptions::default())?;

        println!(
            "{}: {} -> {} triangles (target {})",
            level, original.triangles, stats.triangles, result.target_triangles
        );

        assert!(stats.triangles <= result.target_triangles);
        assert!(stats.triangles + 2 >= result.target_triangles);
        assert!(stats.triangles < previous);
        assert!(stats.watertight, "{} lost watertightness", level);
        assert_eq!(stats.connected_components, 1);
        assert_relative_eq!(
            stats.volume_or_zero(),
            original.volume_or_zero(),
            max_relative = 0.08
        );
        assert_eq!(stats.vertices, result.mesh.vertex_count());

        previous = stats.triangles;
    }
    Ok(())
}

#[test]
fn test_small_mesh_is_only_cleaned() {
    let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
    let result = simplify(&mesh, SimplificationLevel::Aggressive);

    assert_eq!(result.target_triangles, 100);
    assert_eq!(result.mesh.triangle_count(), 12);
    assert_eq!(result.mesh.vertex_count(), 8);
}

#[test]
fn test_unwelded_ply_is_welded_before_decimation() -> Result<()> {
    let cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), false).to_mesh();

    // One vertex per corner per triangle, the way many scanners export
    let mut ply = String::new();
    writeln!(ply, "ply\nformat ascii 1.0")?;
    writeln!(ply, "element vertex {}", cube.triangle_count() * 3)?;
    writeln!(ply, "property double x\nproperty double y\nproperty double z")?;
    writeln!(ply, "element face {}", cube.triangle_count())?;
    writeln!(ply, "property list uchar int vertex_indices\nend_header")?;
    for triangle in &cube.triangles {
        for p in cube.corners(triangle) {
            writeln!(ply, "{} {} {}", p.x, p.y, p.z)?;
        }
    }
    for i in 0..cube.triangle_count() {
        writeln!(ply, "3 {} {} {}", 3 * i, 3 * i + 1, 3 * i + 2)?;
    }

    let mut file = NamedTempFile::with_suffix(MeshFormat::Ply.suffix())?;
    file.write_all(ply.as_bytes())?;
    let soup = load_mesh(file.path())?;
    assert_eq!(soup.vertex_count(), 36);
    assert!(!analyze(&soup, &AnalysisOptions::default())?.watertight);

    let result = simplify(&soup, SimplificationLevel::Mild);
    assert_eq!(result.duplicated_vertices_removed, 28);
    assert_eq!(result.mesh.vertex_count(), 8);

    let stats = analyze(&result.mesh, &AnalysisOptions::default())?;
    assert!(stats.watertight);
    assert_relative_eq!(stats.volume_or_zero(), 8.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_open_grid_keeps_its_outline() -> Result<()> {
    let mesh = Primitive::grid(21, 0.5).to_mesh();
    let result = simplify(&mesh, SimplificationLevel::Medium);
    let stats = analyze(&result.mesh, &AnalysisOptions::default())?;

    assert_eq!(result.original_triangles, 800);
    assert!(stats.triangles <= 400);
    for axis in 0..3 {
        assert_relative_eq!(stats.bounding_box.min_bound[axis], 0.0, epsilon = 1e-6);
    }
    assert_relative_eq!(stats.bounding_box.max_bound[0], 10.0, epsilon = 1e-6);
    assert_relative_eq!(stats.bounding_box.max_bound[1], 10.0, epsilon = 1e-6);
    assert_relative_eq!(stats.surface_area, 100.0, epsilon = 1e-6);
    Ok(())
}
