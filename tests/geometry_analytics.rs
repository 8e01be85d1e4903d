// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Geometry analytics verification tests

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use scanalyzer::geometry::{analyze, AnalysisOptions, Mesh, MeshAnalysis, Primitive};
use scanalyzer::ScanError;
use std::f64::consts::PI;

#[test]
fn test_cube_metrics() -> Result<()> {
    let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();
    let stats = analyze(&mesh, &AnalysisOptions::default())?;

    println!("Cube 10x10x10: {:#?}", stats);

    assert_eq!(stats.vertices, 8);
    assert_eq!(stats.triangles, 12);
    assert!(stats.watertight);
    assert_relative_eq!(stats.volume.unwrap(), 1000.0, epsilon = 1e-9);
    assert_relative_eq!(stats.surface_area, 600.0, epsilon = 1e-9);
    assert_relative_eq!(stats.convex_hull_volume, 1000.0, max_relative = 1e-4);
    assert_eq!(stats.bounding_box.min_bound, [-5.0, -5.0, -5.0]);
    assert_eq!(stats.bounding_box.max_bound, [5.0, 5.0, 5.0]);
    assert_eq!(stats.non_manifold_edge_count, 0);
    assert_eq!(stats.connected_components, 1);
    assert_eq!(stats.sharp_edge_count, 12);
    assert_relative_eq!(stats.approx_thickness, 10.0);

    // Every face is a right isosceles triangle: R / r = 1 + sqrt(2)
    assert_relative_eq!(
        stats.average_triangle_aspect_ratio,
        1.0 + 2f64.sqrt(),
        epsilon = 1e-9
    );
    // Two legs of 10 and a hypotenuse of 10·sqrt(2) per triangle
    assert_relative_eq!(
        stats.average_edge_length,
        (20.0 + 10.0 * 2f64.sqrt()) / 3.0,
        epsilon = 1e-9
    );

    assert!(stats.min_curvature >= 10.0);
    assert!(stats.max_curvature <= 10.0 * 3f64.sqrt());
    assert!(stats.min_curvature <= stats.average_curvature);
    assert!(stats.average_curvature <= stats.max_curvature);

    Ok(())
}

#[test]
fn test_sphere_volume_and_surface_area() -> Result<()> {
    let radius = 5.0;
    let mesh = Primitive::sphere(radius, 32, 64).to_mesh();
    let stats = analyze(&mesh, &AnalysisOptions::default())?;

    let expected_volume = 4.0 / 3.0 * PI * radius.powi(3);
    let expected_area = 4.0 * PI * radius.powi(2);

    println!(
        "Sphere r={}: volume {:.3} (expected {:.3}), area {:.3} (expected {:.3})",
        radius,
        stats.volume_or_zero(),
        expected_volume,
        stats.surface_area,
        expected_area
    );

    assert!(stats.watertight);
    assert_relative_eq!(stats.volume_or_zero(), expected_volume, max_relative = 0.02);
    assert_relative_eq!(stats.surface_area, expected_area, max_relative = 0.02);
    assert_relative_eq!(
        stats.convex_hull_volume,
        stats.volume_or_zero(),
        max_relative = 1e-3
    );
    assert_eq!(stats.sharp_edge_count, 0);
    assert_relative_eq!(stats.approx_thickness, 2.0 * radius, max_relative = 1e-9);

    Ok(())
}

#[test]
fn test_open_grid_has_no_volume() -> Result<()> {
    let mesh = Primitive::grid(6, 2.0).to_mesh();
    let stats = analyze(&mesh, &AnalysisOptions::default())?;

    assert!(!stats.watertight);
    assert_eq!(stats.volume, None);
    assert_eq!(stats.convex_hull_volume, 0.0);
    assert_eq!(stats.approx_thickness, 0.0);
    assert_eq!(stats.connected_components, 1);
    assert_eq!(stats.sharp_edge_count, 0);
    assert_relative_eq!(stats.surface_area, 100.0, epsilon = 1e-9);

    let json = serde_json::to_value(&stats)?;
    assert!(json["volume"].is_null());

    Ok(())
}

#[test]
fn test_disjoint_pieces_are_counted() -> Result<()> {
    let mut mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
    let mut far = Primitive::tetrahedron(1.0).to_mesh();
    for v in &mut far.vertices {
        v.position += Vector3::new(10.0, 0.0, 0.0);
    }
    mesh.merge(&far);

    let stats = analyze(&mesh, &AnalysisOptions::default())?;
    assert_eq!(stats.connected_components, 2);
    assert!(stats.watertight);
    let tetra_volume = 1.0 / (6.0 * 2f64.sqrt());
    assert_relative_eq!(stats.volume_or_zero(), 1.0 + tetra_volume, epsilon = 1e-9);

    Ok(())
}

#[test]
fn test_fin_is_non_manifold() -> Result<()> {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.5, 1.0, 0.0),
        Point3::new(0.5, -1.0, 0.0),
        Point3::new(0.5, 0.0, 1.0),
    ];
    let mesh = Mesh::from_positions(positions, vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]]);

    let stats = analyze(&mesh, &AnalysisOptions::default())?;
    assert_eq!(stats.non_manifold_edge_count, 1);
    assert!(!stats.watertight);
    assert_eq!(stats.volume, None);

    Ok(())
}

#[test]
fn test_sharp_angle_threshold_is_configurable() -> Result<()> {
    let mesh = Primitive::sphere(1.0, 12, 8).to_mesh();
    let loose = analyze(&mesh, &AnalysisOptions::default())?;
    let strict = analyze(
        &mesh,
        &AnalysisOptions {
            sharp_angle_degrees: 5.0,
        },
    )?;
    assert!(strict.sharp_edge_count > loose.sharp_edge_count);
    Ok(())
}

#[test]
fn test_invalid_meshes() {
    assert!(matches!(
        analyze(&Mesh::new(), &AnalysisOptions::default()),
        Err(ScanError::EmptyMesh)
    ));

    let mut broken = Mesh::from_positions(
        vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
        vec![[0, 1, 2]],
    );
    broken.triangles[0].indices[2] = 7;
    assert!(matches!(
        analyze(&broken, &AnalysisOptions::default()),
        Err(ScanError::InvalidIndex { index: 7, .. })
    ));

    let fallback = MeshAnalysis::fallback(&broken);
    assert_eq!(fallback.triangles, 1);
    assert_eq!(fallback.volume, Some(0.0));
    assert!(!fallback.watertight);
}
