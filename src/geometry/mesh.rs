// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Indexed triangle mesh and cleaning operations

use super::BoundingBox;
use crate::error::{Result, ScanError};
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    /// Vertex with a zero normal, to be filled by `compute_vertex_normals`
    pub fn at(position: Point3<f64>) -> Self {
        Self::new(position, Vector3::zeros())
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }

    /// True when two corners share a vertex index
    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.indices;
        a == b || b == c || a == c
    }

    /// The three edges as (from, to) pairs in winding order
    pub fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.indices;
        [(a, b), (b, c), (c, a)]
    }
}

/// Triangular mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Build a mesh from raw positions and faces and compute its normals
    pub fn from_positions(positions: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        let mut mesh = Self {
            vertices: positions.into_iter().map(Vertex::at).collect(),
            triangles: faces.into_iter().map(Triangle::new).collect(),
        };
        mesh.compute_vertex_normals();
        mesh
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    /// Append another mesh, offsetting its indices
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            let [a, b, c] = triangle.indices;
            self.triangles
                .push(Triangle::new([a + offset, b + offset, c + offset]));
        }
    }

    /// Check that every triangle index refers to an existing vertex
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();
        for (i, triangle) in self.triangles.iter().enumerate() {
            if let Some(&index) = triangle.indices.iter().find(|&&idx| idx >= vertex_count) {
                return Err(ScanError::InvalidIndex {
                    triangle: i,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// Corner positions of a triangle
    pub fn corners(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        let [a, b, c] = triangle.indices;
        [
            self.vertices[a].position,
            self.vertices[b].position,
            self.vertices[c].position,
        ]
    }

    /// Unnormalised face normal (length is twice the area)
    pub fn triangle_cross(&self, triangle: &Triangle) -> Vector3<f64> {
        let [p0, p1, p2] = self.corners(triangle);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Unit face normal, `None` for zero-area triangles
    pub fn triangle_normal(&self, triangle: &Triangle) -> Option<Vector3<f64>> {
        let cross = self.triangle_cross(triangle);
        let norm = cross.norm();
        if norm > 1e-12 {
            Some(cross / norm)
        } else {
            None
        }
    }

    pub fn triangle_area(&self, triangle: &Triangle) -> f64 {
        self.triangle_cross(triangle).norm() * 0.5
    }

    pub fn surface_area(&self) -> f64 {
        self.triangles.iter().map(|t| self.triangle_area(t)).sum()
    }

    /// Sum of signed tetrahedron volumes against the origin.
    /// Positive for closed meshes wound counter-clockwise seen from outside.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [p0, p1, p2] = self.corners(t);
                p0.coords.dot(&p1.coords.cross(&p2.coords)) / 6.0
            })
            .sum()
    }

    /// Merge vertices whose positions are bit-identical and remap triangles.
    /// Returns the number of vertices removed.
    pub fn remove_duplicated_vertices(&mut self) -> usize {
        let original_count = self.vertices.len();
        let mut first_seen: AHashMap<[u64; 3], usize> = AHashMap::with_capacity(original_count);
        let mut remap = Vec::with_capacity(original_count);
        let mut kept: Vec<Vertex> = Vec::with_capacity(original_count);

        for vertex in &self.vertices {
            let p = vertex.position;
            // -0.0 and 0.0 are the same point
            let key = [
                (p.x + 0.0).to_bits(),
                (p.y + 0.0).to_bits(),
                (p.z + 0.0).to_bits(),
            ];
            let index = *first_seen.entry(key).or_insert_with(|| {
                kept.push(*vertex);
                kept.len() - 1
            });
            remap.push(index);
        }

        for triangle in &mut self.triangles {
            for idx in &mut triangle.indices {
                *idx = remap[*idx];
            }
        }

        self.vertices = kept;
        original_count - self.vertices.len()
    }

    /// Drop triangles that repeat a vertex index.
    /// Returns the number of triangles removed.
    pub fn remove_degenerate_triangles(&mut self) -> usize {
        let original_count = self.triangles.len();
        self.triangles.retain(|t| !t.is_degenerate());
        original_count - self.triangles.len()
    }

    /// Remove vertices not referenced by any triangle.
    /// Returns the number of vertices removed.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for triangle in &self.triangles {
            for &idx in &triangle.indices {
                used[idx] = true;
            }
        }

        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for (old, vertex) in self.vertices.iter().enumerate() {
            if used[old] {
                remap[old] = kept.len();
                kept.push(*vertex);
            }
        }

        for triangle in &mut self.triangles {
            for idx in &mut triangle.indices {
                *idx = remap[*idx];
            }
        }

        let removed = self.vertices.len() - kept.len();
        self.vertices = kept;
        removed
    }

    /// Recompute vertex normals as the area-weighted average of face normals
    pub fn compute_vertex_normals(&mut self) {
        let mut sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            // Cross product length is proportional to area, so this weights by area
            let cross = self.triangle_cross(triangle);
            if cross.norm() > 1e-12 {
                for &idx in &triangle.indices {
                    sums[idx] += cross;
                }
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = sum
                .try_normalize(1e-12)
                .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
        }
    }

    /// True when at least one vertex carries a non-zero normal
    pub fn has_normals(&self) -> bool {
        self.vertices.iter().any(|v| v.normal.norm_squared() > 0.0)
    }
}
