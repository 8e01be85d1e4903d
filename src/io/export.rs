// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Mesh exporters

use super::export_gltf;
use crate::error::{Result, ScanError};
use crate::geometry::{Mesh, Triangle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export a mesh, picking the writer from the file extension
///
/// `.stl` is written as binary STL, `.gltf` and `.glb` go through the glTF
/// writer, and any other extension falls back to ASCII STL.
pub fn export_mesh(mesh: &Mesh, path: &Path) -> Result<()> {
    if mesh.is_empty() {
        return Err(ScanError::EmptyMesh);
    }
    mesh.validate()?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "stl" => export_stl_binary(mesh, path)?,
        "gltf" | "glb" => export_gltf::export(mesh, path)?,
        _ => export_stl_ascii(mesh, path)?,
    }

    log::info!(
        "exported {} triangles to {}",
        mesh.triangle_count(),
        path.display()
    );
    Ok(())
}

fn facet_normal(mesh: &Mesh, triangle: &Triangle) -> [f32; 3] {
    mesh.triangle_normal(triangle)
        .map(|n| [n.x as f32, n.y as f32, n.z as f32])
        .unwrap_or([0.0; 3])
}

fn corner(mesh: &Mesh, index: usize) -> [f32; 3] {
    let p = mesh.vertices[index].position;
    [p.x as f32, p.y as f32, p.z as f32]
}

pub fn export_stl_binary(mesh: &Mesh, path: &Path) -> Result<()> {
    use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

    let triangles: Vec<StlTriangle> = mesh
        .triangles
        .iter()
        .map(|tri| StlTriangle {
            normal: Normal::new(facet_normal(mesh, tri)),
            vertices: [
                StlVertex::new(corner(mesh, tri.indices[0])),
                StlVertex::new(corner(mesh, tri.indices[1])),
                StlVertex::new(corner(mesh, tri.indices[2])),
            ],
        })
        .collect();

    let mut file = BufWriter::new(File::create(path)?);
    stl_io::write_stl(&mut file, triangles.iter())?;
    file.flush()?;
    Ok(())
}

pub fn export_stl_ascii(mesh: &Mesh, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "solid scanalyzer")?;
    for tri in &mesh.triangles {
        let n = facet_normal(mesh, tri);
        writeln!(file, "  facet normal {} {} {}", n[0], n[1], n[2])?;
        writeln!(file, "    outer loop")?;
        for &index in &tri.indices {
            let p = corner(mesh, index);
            writeln!(file, "      vertex {} {} {}", p[0], p[1], p[2])?;
        }
        writeln!(file, "    endloop")?;
        writeln!(file, "  endfacet")?;
    }
    writeln!(file, "endsolid scanalyzer")?;

    file.flush()?;
    Ok(())
}
