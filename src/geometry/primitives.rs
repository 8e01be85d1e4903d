// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Generated reference meshes

use super::Mesh;
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Closed (or, for grids, planar) reference shapes with shared vertices
pub enum Primitive {
    Cube { size: Vector3<f64>, center: bool },
    Sphere { r: f64, stacks: u32, slices: u32 },
    Grid { n: u32, spacing: f64 },
    Tetrahedron { edge: f64 },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    /// UV sphere; `stacks` is clamped to at least 2 and `slices` to at least 3
    pub fn sphere(r: f64, stacks: u32, slices: u32) -> Self {
        Self::Sphere {
            r,
            stacks: stacks.max(2),
            slices: slices.max(3),
        }
    }

    /// Flat `n` x `n` vertex grid in the XY plane
    pub fn grid(n: u32, spacing: f64) -> Self {
        Self::Grid {
            n: n.max(2),
            spacing,
        }
    }

    pub fn tetrahedron(edge: f64) -> Self {
        Self::Tetrahedron { edge }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cube { size, center } => cube_mesh(*size, *center),
            Self::Sphere { r, stacks, slices } => sphere_mesh(*r, *stacks, *slices),
            Self::Grid { n, spacing } => grid_mesh(*n, *spacing),
            Self::Tetrahedron { edge } => tetrahedron_mesh(*edge),
        }
    }
}

fn cube_mesh(size: Vector3<f64>, center: bool) -> Mesh {
    let origin = if center { -size / 2.0 } else { Vector3::zeros() };
    let (x0, y0, z0) = (origin.x, origin.y, origin.z);
    let (x1, y1, z1) = (x0 + size.x, y0 + size.y, z0 + size.z);

    let positions = vec![
        Point3::new(x0, y0, z0),
        Point3::new(x1, y0, z0),
        Point3::new(x1, y1, z0),
        Point3::new(x0, y1, z0),
        Point3::new(x0, y0, z1),
        Point3::new(x1, y0, z1),
        Point3::new(x1, y1, z1),
        Point3::new(x0, y1, z1),
    ];

    // Outward winding
    let faces = vec![
        [4, 5, 6],
        [4, 6, 7],
        [1, 0, 3],
        [1, 3, 2],
        [5, 1, 2],
        [5, 2, 6],
        [0, 4, 7],
        [0, 7, 3],
        [7, 6, 2],
        [7, 2, 3],
        [0, 1, 5],
        [0, 5, 4],
    ];

    Mesh::from_positions(positions, faces)
}

fn sphere_mesh(radius: f64, stacks: u32, slices: u32) -> Mesh {
    let stacks = stacks as usize;
    let slices = slices as usize;
    let mut positions = Vec::with_capacity(2 + (stacks - 1) * slices);

    positions.push(Point3::new(0.0, 0.0, radius));
    for i in 1..stacks {
        let phi = PI * i as f64 / stacks as f64;
        for j in 0..slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            positions.push(Point3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            ));
        }
    }
    positions.push(Point3::new(0.0, 0.0, -radius));

    let north = 0;
    let south = positions.len() - 1;
    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + j % slices;

    let mut faces = Vec::with_capacity(2 * slices * (stacks - 1));
    for j in 0..slices {
        faces.push([north, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            let a = ring(i, j);
            let b = ring(i + 1, j);
            let c = ring(i + 1, j + 1);
            let d = ring(i, j + 1);
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    for j in 0..slices {
        faces.push([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]);
    }

    Mesh::from_positions(positions, faces)
}

fn grid_mesh(n: u32, spacing: f64) -> Mesh {
    let n = n as usize;
    let mut positions = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            positions.push(Point3::new(x as f64 * spacing, y as f64 * spacing, 0.0));
        }
    }

    let mut faces = Vec::with_capacity(2 * (n - 1) * (n - 1));
    for y in 0..n - 1 {
        for x in 0..n - 1 {
            let a = y * n + x;
            let b = a + 1;
            let c = a + n + 1;
            let d = a + n;
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }

    Mesh::from_positions(positions, faces)
}

fn tetrahedron_mesh(edge: f64) -> Mesh {
    let s = edge / (2.0 * 2f64.sqrt());
    let positions = vec![
        Point3::new(s, s, s),
        Point3::new(s, -s, -s),
        Point3::new(-s, s, -s),
        Point3::new(-s, -s, s),
    ];
    let faces = vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];
    Mesh::from_positions(positions, faces)
}
