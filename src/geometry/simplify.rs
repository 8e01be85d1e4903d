// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Mesh simplification by quadric error metric edge collapse

use super::topology::{edge_key, EdgeMap};
use super::Mesh;
use crate::error::ScanError;
use ahash::AHashSet;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

/// Simplification never targets fewer triangles than this
pub const MIN_TARGET_TRIANGLES: usize = 100;

/// Extra weight on the planes that pin open boundaries in place
const BOUNDARY_WEIGHT: f64 = 1000.0;

/// How strongly to reduce the triangle count
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum SimplificationLevel {
    Mild,
    Medium,
    Aggressive,
}

impl SimplificationLevel {
    pub const ALL: [SimplificationLevel; 3] = [Self::Mild, Self::Medium, Self::Aggressive];

    /// Fraction of triangles kept
    pub fn factor(self) -> f64 {
        match self {
            Self::Mild => 0.75,
            Self::Medium => 0.5,
            Self::Aggressive => 0.25,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "Mild",
            Self::Medium => "Medium",
            Self::Aggressive => "Aggressive",
        }
    }
}

impl fmt::Display for SimplificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimplificationLevel {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Ok(Self::Mild),
            "medium" => Ok(Self::Medium),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(ScanError::UnknownLevel(s.to_string())),
        }
    }
}

/// Triangle budget for a level: `max(100, floor(n * factor))`
pub fn target_triangles(level: SimplificationLevel, triangle_count: usize) -> usize {
    ((triangle_count as f64 * level.factor()).floor() as usize).max(MIN_TARGET_TRIANGLES)
}

/// Outcome of `simplify`
#[derive(Debug, Clone)]
pub struct SimplificationResult {
    pub mesh: Mesh,
    pub level: SimplificationLevel,
    pub target_triangles: usize,
    pub original_triangles: usize,
    pub duplicated_vertices_removed: usize,
    pub degenerate_triangles_removed: usize,
}

/// Clean the mesh, decimate it to the level's budget and recompute normals
pub fn simplify(mesh: &Mesh, level: SimplificationLevel) -> SimplificationResult {
    let mut cleaned = mesh.clone();
    let duplicated_vertices_removed = cleaned.remove_duplicated_vertices();
    let degenerate_triangles_removed = cleaned.remove_degenerate_triangles();

    let target = target_triangles(level, cleaned.triangle_count());
    let mut simplified = decimate(&cleaned, target);
    simplified.remove_unreferenced_vertices();
    simplified.compute_vertex_normals();

    log::info!(
        "{} simplification: {} -> {} triangles (target {})",
        level,
        mesh.triangle_count(),
        simplified.triangle_count(),
        target
    );

    SimplificationResult {
        mesh: simplified,
        level,
        target_triangles: target,
        original_triangles: mesh.triangle_count(),
        duplicated_vertices_removed,
        degenerate_triangles_removed,
    }
}

/// Reduce a mesh for display when it exceeds `cap` triangles
pub fn preview_mesh(mesh: &Mesh, cap: usize) -> Mesh {
    if mesh.triangle_count() <= cap {
        return mesh.clone();
    }
    log::debug!(
        "preview: decimating {} triangles to display cap {}",
        mesh.triangle_count(),
        cap
    );
    decimate(mesh, cap)
}

/// Collapse edges in order of quadric error until at most `target` triangles
/// remain or no valid collapse is left. Degenerate input triangles are dropped.
pub fn decimate(mesh: &Mesh, target: usize) -> Mesh {
    if mesh.triangle_count() <= target {
        return mesh.clone();
    }

    let mut decimator = Decimator::new(mesh);
    let collapses = decimator.run(target);
    log::debug!(
        "decimate: {} collapses, {} -> {} triangles",
        collapses,
        mesh.triangle_count(),
        decimator.live_faces
    );
    decimator.into_mesh()
}

#[derive(Debug, Clone)]
struct Candidate {
    cost: f64,
    keep: usize,
    remove: usize,
    keep_stamp: u32,
    remove_stamp: u32,
    position: Vector3<f64>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost, index order breaks ties
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.keep.cmp(&self.keep))
            .then_with(|| other.remove.cmp(&self.remove))
    }
}

struct Decimator {
    positions: Vec<Vector3<f64>>,
    quadrics: Vec<Matrix4<f64>>,
    faces: Vec<[usize; 3]>,
    face_alive: Vec<bool>,
    vertex_faces: Vec<Vec<usize>>,
    vertex_alive: Vec<bool>,
    /// Bumped whenever a vertex moves or absorbs another; stale heap entries are skipped
    stamps: Vec<u32>,
    live_faces: usize,
    heap: BinaryHeap<Candidate>,
}

impl Decimator {
    fn new(mesh: &Mesh) -> Self {
        let vertex_count = mesh.vertices.len();
        let faces: Vec<[usize; 3]> = mesh
            .triangles
            .iter()
            .filter(|t| !t.is_degenerate())
            .map(|t| t.indices)
            .collect();

        let mut vertex_faces = vec![Vec::new(); vertex_count];
        for (f, face) in faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v].push(f);
            }
        }

        let mut decimator = Self {
            positions: mesh.vertices.iter().map(|v| v.position.coords).collect(),
            quadrics: vec![Matrix4::zeros(); vertex_count],
            face_alive: vec![true; faces.len()],
            live_faces: faces.len(),
            faces,
            vertex_faces,
            vertex_alive: vec![true; vertex_count],
            stamps: vec![0; vertex_count],
            heap: BinaryHeap::new(),
        };

        decimator.initialize_quadrics(mesh);
        decimator.initialize_heap();
        decimator
    }

    fn plane_quadric(normal: &Vector3<f64>, point: &Vector3<f64>) -> Matrix4<f64> {
        let plane = Vector4::new(normal.x, normal.y, normal.z, -normal.dot(point));
        plane * plane.transpose()
    }

    fn initialize_quadrics(&mut self, mesh: &Mesh) {
        for face in &self.faces {
            let [a, b, c] = *face;
            let cross = (self.positions[b] - self.positions[a])
                .cross(&(self.positions[c] - self.positions[a]));
            if let Some(normal) = cross.try_normalize(1e-12) {
                let q = Self::plane_quadric(&normal, &self.positions[a]);
                self.quadrics[a] += q;
                self.quadrics[b] += q;
                self.quadrics[c] += q;
            }
        }

        // Planes perpendicular to open boundaries keep their outline in place
        let edges = EdgeMap::build(mesh);
        for (&(a, b), faces) in edges.iter() {
            if faces.len() != 1 {
                continue;
            }
            let [p, q, r] = mesh.triangles[faces[0]].indices;
            let face_normal = (self.positions[q] - self.positions[p])
                .cross(&(self.positions[r] - self.positions[p]));
            let direction = self.positions[b] - self.positions[a];
            if let Some(normal) = direction.cross(&face_normal).try_normalize(1e-12) {
                let constraint =
                    Self::plane_quadric(&normal, &self.positions[a]) * BOUNDARY_WEIGHT;
                self.quadrics[a] += constraint;
                self.quadrics[b] += constraint;
            }
        }
    }

    fn initialize_heap(&mut self) {
        let mut seen: AHashSet<(usize, usize)> = AHashSet::new();
        for f in 0..self.faces.len() {
            let [a, b, c] = self.faces[f];
            for (u, v) in [(a, b), (b, c), (c, a)] {
                if seen.insert(edge_key(u, v)) {
                    self.push_candidate(u, v);
                }
            }
        }
    }

    fn error(q: &Matrix4<f64>, position: &Vector3<f64>) -> f64 {
        let h = position.push(1.0);
        (h.transpose() * q * h)[0].max(0.0)
    }

    fn push_candidate(&mut self, keep: usize, remove: usize) {
        let q = self.quadrics[keep] + self.quadrics[remove];
        let pa = self.positions[keep];
        let pb = self.positions[remove];
        let midpoint = (pa + pb) * 0.5;
        let edge_length = (pb - pa).norm();

        let a: Matrix3<f64> = q.fixed_view::<3, 3>(0, 0).into_owned();
        let rhs = -q.fixed_view::<3, 1>(0, 3).into_owned();
        let optimal = a
            .try_inverse()
            .map(|inv| inv * rhs)
            .filter(|p| p.iter().all(|x| x.is_finite()))
            .filter(|p| (p - midpoint).norm() <= 2.0 * edge_length.max(1e-12));

        let (position, cost) = match optimal {
            Some(p) => (p, Self::error(&q, &p)),
            None => [pa, pb, midpoint]
                .into_iter()
                .map(|p| (p, Self::error(&q, &p)))
                .min_by(|x, y| x.1.total_cmp(&y.1))
                .unwrap_or((midpoint, 0.0)),
        };

        self.heap.push(Candidate {
            cost,
            keep,
            remove,
            keep_stamp: self.stamps[keep],
            remove_stamp: self.stamps[remove],
            position,
        });
    }

    fn run(&mut self, target: usize) -> usize {
        let mut collapses = 0;

        while self.live_faces > target {
            let Some(candidate) = self.heap.pop() else {
                break;
            };
            let (keep, remove) = (candidate.keep, candidate.remove);

            if !self.vertex_alive[keep]
                || !self.vertex_alive[remove]
                || self.stamps[keep] != candidate.keep_stamp
                || self.stamps[remove] != candidate.remove_stamp
            {
                continue;
            }

            if !self.can_collapse(keep, remove, &candidate.position) {
                continue;
            }

            self.collapse(keep, remove, candidate.position);
            collapses += 1;

            for neighbour in self.neighbours(keep) {
                self.push_candidate(keep, neighbour);
            }
        }

        collapses
    }

    fn live_faces_of(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.vertex_faces[v]
            .iter()
            .copied()
            .filter(move |&f| self.face_alive[f])
    }

    fn neighbours(&self, v: usize) -> Vec<usize> {
        let mut neighbours: Vec<usize> = self
            .live_faces_of(v)
            .flat_map(|f| self.faces[f])
            .filter(|&u| u != v)
            .collect();
        neighbours.sort_unstable();
        neighbours.dedup();
        neighbours
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        let mut corners: Vec<usize> = self
            .live_faces_of(v)
            .flat_map(|f| self.faces[f])
            .filter(|&u| u != v)
            .collect();
        corners.sort_unstable();
        // A neighbour seen in only one face marks a boundary edge
        corners
            .chunk_by(|x, y| x == y)
            .any(|run| run.len() == 1)
    }

    /// Sorted pair of the corners other than `v`
    fn opposite_pair(&self, f: usize, v: usize) -> (usize, usize) {
        let others: Vec<usize> = self.faces[f].iter().copied().filter(|&u| u != v).collect();
        edge_key(others[0], others[1])
    }

    fn can_collapse(&self, keep: usize, remove: usize, position: &Vector3<f64>) -> bool {
        let shared: Vec<usize> = self
            .live_faces_of(keep)
            .filter(|&f| self.faces[f].contains(&remove))
            .collect();
        if shared.is_empty() {
            return false;
        }

        // Link condition: the only common neighbours are the shared faces' apexes
        let keep_ring = self.neighbours(keep);
        let remove_ring = self.neighbours(remove);
        let common = keep_ring
            .iter()
            .filter(|v| remove_ring.binary_search(v).is_ok())
            .count();
        if common != shared.len() {
            return false;
        }

        // Joining two boundary vertices across the interior pinches the surface
        if shared.len() > 1 && self.is_boundary_vertex(keep) && self.is_boundary_vertex(remove) {
            return false;
        }

        // Faces that would become exact duplicates (e.g. collapsing a tetrahedron)
        let keep_pairs: AHashSet<(usize, usize)> = self
            .live_faces_of(keep)
            .filter(|f| !shared.contains(f))
            .map(|f| self.opposite_pair(f, keep))
            .collect();
        let duplicates = self
            .live_faces_of(remove)
            .filter(|f| !shared.contains(f))
            .any(|f| keep_pairs.contains(&self.opposite_pair(f, remove)));
        if duplicates {
            return false;
        }

        // Reject collapses that flip or flatten a surrounding face
        for (moved, f) in self
            .live_faces_of(keep)
            .map(|f| (keep, f))
            .chain(self.live_faces_of(remove).map(|f| (remove, f)))
        {
            if shared.contains(&f) {
                continue;
            }
            let corners = self.faces[f];
            let before = self.face_cross(&corners, None);
            if before.norm() <= 1e-14 {
                continue;
            }
            let after = self.face_cross(&corners, Some((moved, position)));
            if after.dot(&before) <= 0.0 {
                return false;
            }
        }

        true
    }

    fn face_cross(&self, corners: &[usize; 3], moved: Option<(usize, &Vector3<f64>)>) -> Vector3<f64> {
        let at = |v: usize| match moved {
            Some((m, p)) if m == v => *p,
            _ => self.positions[v],
        };
        let [a, b, c] = *corners;
        (at(b) - at(a)).cross(&(at(c) - at(a)))
    }

    fn collapse(&mut self, keep: usize, remove: usize, position: Vector3<f64>) {
        self.positions[keep] = position;
        let absorbed = self.quadrics[remove];
        self.quadrics[keep] += absorbed;

        let remove_faces = std::mem::take(&mut self.vertex_faces[remove]);
        for f in remove_faces {
            if !self.face_alive[f] {
                continue;
            }
            if self.faces[f].contains(&keep) {
                self.face_alive[f] = false;
                self.live_faces -= 1;
            } else {
                for corner in self.faces[f].iter_mut() {
                    if *corner == remove {
                        *corner = keep;
                    }
                }
                self.vertex_faces[keep].push(f);
            }
        }

        self.vertex_alive[remove] = false;
        self.stamps[keep] = self.stamps[keep].wrapping_add(1);

        let face_alive = &self.face_alive;
        self.vertex_faces[keep].retain(|&f| face_alive[f]);
        self.vertex_faces[keep].sort_unstable();
        self.vertex_faces[keep].dedup();
    }

    fn into_mesh(self) -> Mesh {
        let mut remap = vec![usize::MAX; self.positions.len()];
        let mut positions = Vec::new();
        let mut faces = Vec::with_capacity(self.live_faces);

        for (f, face) in self.faces.iter().enumerate() {
            if !self.face_alive[f] {
                continue;
            }
            let mut mapped = [0usize; 3];
            for (slot, &v) in face.iter().enumerate() {
                if remap[v] == usize::MAX {
                    remap[v] = positions.len();
                    positions.push(Point3::from(self.positions[v]));
                }
                mapped[slot] = remap[v];
            }
            faces.push(mapped);
        }

        Mesh::from_positions(positions, faces)
    }
}
