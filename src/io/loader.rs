// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Mesh file loading for PLY, OBJ and STL

use crate::error::{Result, ScanError};
use crate::geometry::{Mesh, Triangle, Vertex};
use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MeshFormat {
    Ply,
    Obj,
    Stl,
}

impl MeshFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ply" => Ok(Self::Ply),
            "obj" => Ok(Self::Obj),
            "stl" => Ok(Self::Stl),
            other => Err(ScanError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ScanError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ply => "ply",
            Self::Obj => "obj",
            Self::Stl => "stl",
        }
    }

    /// Temporary-file suffix, including the dot
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Ply => ".ply",
            Self::Obj => ".obj",
            Self::Stl => ".stl",
        }
    }
}

/// True when the path has a supported mesh extension
pub fn is_supported(path: &Path) -> bool {
    MeshFormat::from_path(path).is_ok()
}

/// Load a mesh file, choosing the reader from its extension
pub fn load_mesh(path: &Path) -> Result<Mesh> {
    let format = MeshFormat::from_path(path)?;
    log::debug!("loading {} as {}", path.display(), format.as_str());

    let mut mesh = match format {
        MeshFormat::Ply => read_ply(path)?,
        MeshFormat::Obj => read_obj(path)?,
        MeshFormat::Stl => read_stl(path)?,
    };

    if mesh.triangles.is_empty() {
        return Err(ScanError::NoTriangles(path.to_path_buf()));
    }
    mesh.validate()?;
    if !mesh.has_normals() {
        mesh.compute_vertex_normals();
    }

    log::info!(
        "loaded {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Load uploaded bytes by spilling them to a temporary file of the given format
pub fn load_mesh_bytes(bytes: &[u8], format: MeshFormat) -> Result<Mesh> {
    let mut file = tempfile::Builder::new()
        .prefix("scanalyzer-upload-")
        .suffix(format.suffix())
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    log::debug!("upload of {} bytes spilled to {}", bytes.len(), file.path().display());
    load_mesh(file.path())
}

/// File name up to its first dot, used to key log rows
pub fn mesh_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or("mesh")
        .to_string()
}

/// Hex SHA-256 of a byte slice
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hex SHA-256 of a file, streamed without buffering it whole
pub fn digest_file(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut BufReader::new(File::open(path)?), &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn parse_error(format: &'static str, path: &Path, message: impl ToString) -> ScanError {
    ScanError::Parse {
        format,
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn scalar(property: &Property) -> Option<f64> {
    match *property {
        Property::Char(v) => Some(v as f64),
        Property::UChar(v) => Some(v as f64),
        Property::Short(v) => Some(v as f64),
        Property::UShort(v) => Some(v as f64),
        Property::Int(v) => Some(v as f64),
        Property::UInt(v) => Some(v as f64),
        Property::Float(v) => Some(v as f64),
        Property::Double(v) => Some(v),
        _ => None,
    }
}

fn index_list(property: &Property) -> Option<Vec<i64>> {
    match property {
        Property::ListChar(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListInt(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&i| i as i64).collect()),
        _ => None,
    }
}

/// Fan-triangulate a polygon, rejecting negative indices
fn push_polygon(mesh: &mut Mesh, polygon: &[i64]) -> std::result::Result<(), String> {
    let indices = polygon
        .iter()
        .map(|&i| usize::try_from(i).map_err(|_| format!("negative vertex index {}", i)))
        .collect::<std::result::Result<Vec<usize>, String>>()?;

    for k in 1..indices.len().saturating_sub(1) {
        mesh.add_triangle(Triangle::new([indices[0], indices[k], indices[k + 1]]));
    }
    Ok(())
}

fn read_ply(path: &Path) -> Result<Mesh> {
    let mut reader = BufReader::new(File::open(path)?);
    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| parse_error("PLY", path, e))?;

    let vertices = ply
        .payload
        .get("vertex")
        .ok_or_else(|| parse_error("PLY", path, "missing vertex element"))?;
    let faces = ply.payload.get("face").map(Vec::as_slice).unwrap_or(&[]);

    let mut mesh = Mesh::with_capacity(vertices.len(), faces.len());

    for (i, element) in vertices.iter().enumerate() {
        let coord = |name: &str| element.get(name).and_then(scalar);
        let (x, y, z) = match (coord("x"), coord("y"), coord("z")) {
            (Some(x), Some(y), Some(z)) => (x, y, z),
            _ => return Err(parse_error("PLY", path, format!("vertex {} lacks x/y/z", i))),
        };
        let normal = match (coord("nx"), coord("ny"), coord("nz")) {
            (Some(nx), Some(ny), Some(nz)) => Vector3::new(nx, ny, nz),
            _ => Vector3::zeros(),
        };
        mesh.add_vertex(Vertex::new(Point3::new(x, y, z), normal));
    }

    for (i, element) in faces.iter().enumerate() {
        let polygon = element
            .get("vertex_indices")
            .or_else(|| element.get("vertex_index"))
            .and_then(index_list)
            .ok_or_else(|| parse_error("PLY", path, format!("face {} lacks vertex_indices", i)))?;
        push_polygon(&mut mesh, &polygon).map_err(|e| parse_error("PLY", path, e))?;
    }

    Ok(mesh)
}

fn read_obj(path: &Path) -> Result<Mesh> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ..Default::default()
    };
    let (models, _materials) =
        tobj::load_obj(path, &options).map_err(|e| parse_error("OBJ", path, e))?;

    let mut mesh = Mesh::new();
    for model in &models {
        let offset = mesh.vertex_count();
        for p in model.mesh.positions.chunks_exact(3) {
            mesh.add_vertex(Vertex::at(Point3::new(p[0] as f64, p[1] as f64, p[2] as f64)));
        }
        for tri in model.mesh.indices.chunks_exact(3) {
            mesh.add_triangle(Triangle::new([
                offset + tri[0] as usize,
                offset + tri[1] as usize,
                offset + tri[2] as usize,
            ]));
        }
    }

    Ok(mesh)
}

fn read_stl(path: &Path) -> Result<Mesh> {
    let mut file = File::open(path)?;
    // stl_io merges identical corners into shared vertices
    let stl = stl_io::read_stl(&mut file).map_err(|e| parse_error("STL", path, e))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.add_vertex(Vertex::at(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)));
    }
    for face in &stl.faces {
        mesh.add_triangle(Triangle::new(face.vertices));
    }

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const SQUARE_PLY: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
";

    #[test]
    fn test_format_detection() {
        assert_eq!(MeshFormat::from_path(Path::new("a/bunny.PLY")).unwrap(), MeshFormat::Ply);
        assert_eq!(MeshFormat::from_path(Path::new("part.stl")).unwrap(), MeshFormat::Stl);
        assert!(matches!(
            MeshFormat::from_path(Path::new("scene.fbx")),
            Err(ScanError::UnsupportedFormat(_))
        ));
        assert!(MeshFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_mesh_name() {
        assert_eq!(mesh_name(Path::new("/tmp/bunny.ply")), "bunny");
        assert_eq!(mesh_name(Path::new("scan.v2.obj")), "scan");
    }

    #[test]
    fn test_ply_quad_is_fan_triangulated() -> Result<()> {
        let mesh = load_mesh_bytes(SQUARE_PLY.as_bytes(), MeshFormat::Ply)?;
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangles[1].indices, [0, 2, 3]);
        assert!((mesh.vertices[0].normal.z - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_ply_without_faces_rejected() -> Result<()> {
        let mut file = NamedTempFile::with_suffix(".ply")?;
        write!(
            file,
            "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n"
        )?;
        assert!(matches!(load_mesh(file.path()), Err(ScanError::NoTriangles(_))));
        Ok(())
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(
            digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_digest_matches_bytes() -> Result<()> {
        let mut file = NamedTempFile::with_suffix(".ply")?;
        file.write_all(SQUARE_PLY.as_bytes())?;
        file.flush()?;
        assert_eq!(digest_file(file.path())?, digest_bytes(SQUARE_PLY.as_bytes()));
        assert!(matches!(
            digest_file(Path::new("/definitely/missing/scan.ply")),
            Err(ScanError::Io(_))
        ));
        Ok(())
    }
}
