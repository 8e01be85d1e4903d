// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Connectivity queries: edges, manifoldness, components

use super::Mesh;
use ahash::{AHashMap, AHashSet};

/// Undirected edge with the smaller index first
pub type Edge = (usize, usize);

pub fn edge_key(a: usize, b: usize) -> Edge {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Map from undirected edge to the triangles that use it
#[derive(Debug, Clone, Default)]
pub struct EdgeMap {
    edges: AHashMap<Edge, Vec<usize>>,
}

impl EdgeMap {
    pub fn build(mesh: &Mesh) -> Self {
        let mut edges: AHashMap<Edge, Vec<usize>> =
            AHashMap::with_capacity(mesh.triangles.len() * 3 / 2);

        for (face, triangle) in mesh.triangles.iter().enumerate() {
            if triangle.is_degenerate() {
                continue;
            }
            for (a, b) in triangle.edges() {
                edges.entry(edge_key(a, b)).or_default().push(face);
            }
        }

        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn faces(&self, edge: Edge) -> &[usize] {
        self.edges.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Edge, &Vec<usize>)> {
        self.edges.iter()
    }

    /// Edges shared by more than two triangles
    pub fn non_manifold_edges(&self) -> Vec<Edge> {
        self.collect_where(|count| count > 2)
    }

    /// Edges used by exactly one triangle
    pub fn boundary_edges(&self) -> Vec<Edge> {
        self.collect_where(|count| count == 1)
    }

    /// Every edge is shared by at most two triangles
    pub fn is_edge_manifold(&self) -> bool {
        self.edges.values().all(|faces| faces.len() <= 2)
    }

    fn collect_where(&self, keep: impl Fn(usize) -> bool) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .edges
            .iter()
            .filter(|(_, faces)| keep(faces.len()))
            .map(|(edge, _)| *edge)
            .collect();
        edges.sort_unstable();
        edges
    }
}

/// Triangles incident to each vertex
pub fn vertex_faces(mesh: &Mesh) -> Vec<Vec<usize>> {
    let mut faces = vec![Vec::new(); mesh.vertices.len()];
    for (face, triangle) in mesh.triangles.iter().enumerate() {
        for &idx in &triangle.indices {
            faces[idx].push(face);
        }
    }
    faces
}

/// Sorted, de-duplicated neighbours of every vertex
pub fn adjacency_list(mesh: &Mesh) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); mesh.vertices.len()];
    for triangle in &mesh.triangles {
        for (a, b) in triangle.edges() {
            if a != b {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
    }
    for neighbours in &mut adjacency {
        neighbours.sort_unstable();
        neighbours.dedup();
    }
    adjacency
}

/// Each vertex's incident triangles form a single fan connected through edges
pub fn is_vertex_manifold(mesh: &Mesh) -> bool {
    let incident = vertex_faces(mesh);

    incident.iter().enumerate().all(|(vertex, faces)| {
        if faces.len() <= 1 {
            return true;
        }

        let mut fan = UnionFind::new(faces.len());
        // Two faces around `vertex` are linked when they share a second corner
        let mut by_corner: AHashMap<usize, usize> = AHashMap::new();
        for (slot, &face) in faces.iter().enumerate() {
            for &corner in &mesh.triangles[face].indices {
                if corner == vertex {
                    continue;
                }
                if let Some(&other) = by_corner.get(&corner) {
                    fan.union(slot, other);
                } else {
                    by_corner.insert(corner, slot);
                }
            }
        }
        fan.count() == 1
    })
}

/// Closed two-manifold: no boundary, no non-manifold edges or vertices.
/// A mesh whose triangles are all degenerate has no edges and is not watertight.
pub fn is_watertight(mesh: &Mesh, edges: &EdgeMap) -> bool {
    !edges.is_empty()
        && edges.iter().all(|(_, faces)| faces.len() == 2)
        && is_vertex_manifold(mesh)
}

/// Number of triangle-connected pieces. Vertices used by no triangle are ignored.
pub fn connected_components(mesh: &Mesh) -> usize {
    let mut sets = UnionFind::new(mesh.vertices.len());
    let mut used = vec![false; mesh.vertices.len()];

    for triangle in &mesh.triangles {
        let [a, b, c] = triangle.indices;
        sets.union(a, b);
        sets.union(b, c);
        used[a] = true;
        used[b] = true;
        used[c] = true;
    }

    let roots: AHashSet<usize> = (0..mesh.vertices.len())
        .filter(|&v| used[v])
        .map(|v| sets.find(v))
        .collect();
    roots.len()
}

/// Two-triangle edges whose dihedral angle exceeds `angle_degrees`
pub fn sharp_edges(mesh: &Mesh, edges: &EdgeMap, angle_degrees: f64) -> Vec<Edge> {
    let cos_limit = angle_degrees.to_radians().cos();
    let normals: Vec<_> = mesh
        .triangles
        .iter()
        .map(|t| mesh.triangle_normal(t))
        .collect();

    let mut sharp: Vec<Edge> = edges
        .iter()
        .filter_map(|(edge, faces)| match faces.as_slice() {
            [f0, f1] => match (normals[*f0], normals[*f1]) {
                (Some(n0), Some(n1)) if n0.dot(&n1) < cos_limit => Some(*edge),
                _ => None,
            },
            _ => None,
        })
        .collect();
    sharp.sort_unstable();
    sharp
}

/// Disjoint-set forest with path halving and union by size
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    sets: usize,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
            sets: n,
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        self.sets -= 1;
        true
    }

    /// Number of disjoint sets
    pub fn count(&self) -> usize {
        self.sets
    }
}
