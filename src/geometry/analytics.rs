// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Geometry analytics: size, quality, topology and curvature metrics

use super::topology::{self, EdgeMap};
use super::Mesh;
use crate::error::{Result, ScanError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Floor applied to triangle areas before dividing by them
const MIN_TRIANGLE_AREA: f64 = 1e-12;

/// Tunables for `analyze`
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub sharp_angle_degrees: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            sharp_angle_degrees: 30.0,
        }
    }
}

/// Axis-aligned bounds as reported in JSON
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsReport {
    pub min_bound: [f64; 3],
    pub max_bound: [f64; 3],
}

/// Full analysis of one mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshAnalysis {
    pub vertices: usize,
    pub triangles: usize,
    pub surface_area: f64,
    /// Enclosed volume, only defined for watertight meshes
    pub volume: Option<f64>,
    pub convex_hull_volume: f64,
    pub watertight: bool,
    pub bounding_box: BoundsReport,
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

impl MeshAnalysis {
    /// Reduced analysis used when the full pass fails
    pub fn fallback(mesh: &Mesh) -> Self {
        let valid = mesh.validate().is_ok();
        let watertight = valid && topology::is_watertight(mesh, &EdgeMap::build(mesh));
        let bbox = mesh.bounding_box();
        let (min_bound, max_bound, thickness) = if bbox.is_empty() {
            ([0.0; 3], [0.0; 3], 0.0)
        } else {
            (bbox.min.coords.into(), bbox.max.coords.into(), bbox.min_extent())
        };

        Self {
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
            surface_area: if valid { mesh.surface_area() } else { 0.0 },
            volume: Some(if watertight {
                mesh.signed_volume().abs()
            } else {
                0.0
            }),
            convex_hull_volume: 0.0,
            watertight,
            bounding_box: BoundsReport {
                min_bound,
                max_bound,
            },
            average_edge_length: 0.0,
            average_triangle_aspect_ratio: 0.0,
            non_manifold_edge_count: 0,
            average_curvature: 0.0,
            max_curvature: 0.0,
            min_curvature: 0.0,
            connected_components: 0,
            sharp_edge_count: 0,
            approx_thickness: thickness,
        }
    }

    /// Volume with the missing value read as zero
    pub fn volume_or_zero(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }
}

/// Analyze mesh geometry and compute all metrics
pub fn analyze(mesh: &Mesh, options: &AnalysisOptions) -> Result<MeshAnalysis> {
    if mesh.is_empty() {
        return Err(ScanError::EmptyMesh);
    }
    mesh.validate()?;

    let edges = EdgeMap::build(mesh);
    let watertight = topology::is_watertight(mesh, &edges);
    let bbox = mesh.bounding_box();
    let quality = triangle_quality(mesh);
    let curvature = curvature_proxy(mesh);

    let analysis = MeshAnalysis {
        vertices: mesh.vertex_count(),
        triangles: mesh.triangle_count(),
        surface_area: quality.area,
        volume: watertight.then(|| mesh.signed_volume().abs()),
        convex_hull_volume: convex_hull_volume(mesh),
        watertight,
        bounding_box: BoundsReport {
            min_bound: bbox.min.coords.into(),
            max_bound: bbox.max.coords.into(),
        },
        average_edge_length: quality.average_edge_length,
        average_triangle_aspect_ratio: quality.average_aspect_ratio,
        non_manifold_edge_count: edges.non_manifold_edges().len(),
        average_curvature: curvature.average,
        max_curvature: curvature.max,
        min_curvature: curvature.min,
        connected_components: topology::connected_components(mesh),
        sharp_edge_count: topology::sharp_edges(mesh, &edges, options.sharp_angle_degrees).len(),
        approx_thickness: bbox.min_extent(),
    };

    log::debug!(
        "analyzed {} vertices / {} triangles (watertight: {})",
        analysis.vertices,
        analysis.triangles,
        analysis.watertight
    );

    Ok(analysis)
}

/// Circumradius over inradius; 2.0 for an equilateral triangle.
/// `None` for zero-perimeter triangles.
pub fn triangle_aspect_ratio(a: f64, b: f64, c: f64) -> Option<f64> {
    let perimeter = a + b + c;
    if perimeter <= 0.0 {
        return None;
    }
    let s = perimeter / 2.0;
    let area = (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt().max(MIN_TRIANGLE_AREA);
    let inradius = 2.0 * area / perimeter;
    let circumradius = (a * b * c) / (4.0 * area);
    Some(circumradius / inradius)
}

#[derive(Debug, Default, Clone, Copy)]
struct QualityTotals {
    area: f64,
    edge_length_sum: f64,
    aspect_sum: f64,
    aspect_count: usize,
}

impl QualityTotals {
    fn combine(self, other: Self) -> Self {
        Self {
            area: self.area + other.area,
            edge_length_sum: self.edge_length_sum + other.edge_length_sum,
            aspect_sum: self.aspect_sum + other.aspect_sum,
            aspect_count: self.aspect_count + other.aspect_count,
        }
    }
}

struct TriangleQuality {
    area: f64,
    average_edge_length: f64,
    average_aspect_ratio: f64,
}

fn triangle_quality(mesh: &Mesh) -> TriangleQuality {
    let totals = mesh
        .triangles
        .par_iter()
        .map(|triangle| {
            let [p0, p1, p2] = mesh.corners(triangle);
            let a = (p0 - p1).norm();
            let b = (p1 - p2).norm();
            let c = (p2 - p0).norm();
            let aspect = triangle_aspect_ratio(a, b, c);

            QualityTotals {
                area: mesh.triangle_area(triangle),
                edge_length_sum: a + b + c,
                aspect_sum: aspect.unwrap_or(0.0),
                aspect_count: aspect.is_some() as usize,
            }
        })
        .reduce(QualityTotals::default, QualityTotals::combine);

    let triangle_count = mesh.triangles.len().max(1) as f64;
    TriangleQuality {
        area: totals.area,
        average_edge_length: totals.edge_length_sum / (3.0 * triangle_count),
        average_aspect_ratio: if totals.aspect_count > 0 {
            totals.aspect_sum / totals.aspect_count as f64
        } else {
            0.0
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CurvatureStats {
    min: f64,
    average: f64,
    max: f64,
}

/// Mean neighbour distance per vertex, summarised over the mesh.
/// Larger values mean coarser, more strongly bent neighbourhoods.
fn curvature_proxy(mesh: &Mesh) -> CurvatureStats {
    let adjacency = topology::adjacency_list(mesh);
    let values: Vec<f64> = adjacency
        .par_iter()
        .enumerate()
        .filter(|(_, neighbours)| !neighbours.is_empty())
        .map(|(vertex, neighbours)| {
            let origin = mesh.vertices[vertex].position;
            let total: f64 = neighbours
                .iter()
                .map(|&n| (mesh.vertices[n].position - origin).norm())
                .sum();
            total / neighbours.len() as f64
        })
        .collect();

    if values.is_empty() {
        return CurvatureStats {
            min: 0.0,
            average: 0.0,
            max: 0.0,
        };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = values.iter().sum::<f64>() / values.len() as f64;
    CurvatureStats { min, average, max }
}

/// Volume of the convex hull of all vertices; 0.0 when the hull is flat
pub fn convex_hull_volume(mesh: &Mesh) -> f64 {
    use parry3d::na::Point3 as HullPoint;

    if mesh.vertices.len() < 4 || mesh.bounding_box().min_extent() <= MIN_TRIANGLE_AREA {
        return 0.0;
    }

    let points: Vec<HullPoint<f32>> = mesh
        .vertices
        .iter()
        .map(|v| {
            HullPoint::new(
                v.position.x as f32,
                v.position.y as f32,
                v.position.z as f32,
            )
        })
        .collect();

    match parry3d::transformation::try_convex_hull(&points) {
        Ok((hull_points, hull_faces)) => {
            let signed: f64 = hull_faces
                .iter()
                .map(|face| {
                    let p0 = hull_points[face[0] as usize].coords.cast::<f64>();
                    let p1 = hull_points[face[1] as usize].coords.cast::<f64>();
                    let p2 = hull_points[face[2] as usize].coords.cast::<f64>();
                    p0.dot(&p1.cross(&p2)) / 6.0
                })
                .sum();
            signed.abs()
        }
        Err(err) => {
            log::warn!("convex hull failed: {:?}", err);
            0.0
        }
    }
}
