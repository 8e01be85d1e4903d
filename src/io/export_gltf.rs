// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! glTF 2.0 / GLB writer

use crate::error::Result;
use crate::geometry::Mesh;
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Write `.glb` as a single binary container, anything else as `.gltf` plus a
/// sibling `.bin`
pub fn export(mesh: &Mesh, path: &Path) -> Result<()> {
    let is_glb = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("glb"));

    if is_glb {
        export_glb(mesh, path)
    } else {
        export_gltf_separate(mesh, path)
    }
}

fn export_glb(mesh: &Mesh, path: &Path) -> Result<()> {
    let buffer = build_buffer(mesh);
    let document = build_document(mesh, &buffer, None);

    let mut json_bytes = serde_json::to_vec(&document)?;
    pad_to_four(&mut json_bytes, b' ');
    let mut bin_bytes = buffer.data;
    pad_to_four(&mut bin_bytes, 0);

    let total_length = 12 + 8 + json_bytes.len() + 8 + bin_bytes.len();

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&GLB_MAGIC.to_le_bytes())?;
    file.write_all(&2u32.to_le_bytes())?;
    file.write_all(&(total_length as u32).to_le_bytes())?;

    file.write_all(&(json_bytes.len() as u32).to_le_bytes())?;
    file.write_all(&CHUNK_JSON.to_le_bytes())?;
    file.write_all(&json_bytes)?;

    file.write_all(&(bin_bytes.len() as u32).to_le_bytes())?;
    file.write_all(&CHUNK_BIN.to_le_bytes())?;
    file.write_all(&bin_bytes)?;

    file.flush()?;
    Ok(())
}

fn export_gltf_separate(mesh: &Mesh, path: &Path) -> Result<()> {
    let bin_path = path.with_extension("bin");
    let bin_name = bin_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("mesh.bin")
        .to_string();

    let buffer = build_buffer(mesh);
    let document = build_document(mesh, &buffer, Some(&bin_name));

    std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
    std::fs::write(&bin_path, &buffer.data)?;
    Ok(())
}

/// Packed vertex and index data with the byte range of each view
struct Buffer {
    data: Vec<u8>,
    positions: (usize, usize),
    normals: (usize, usize),
    indices: (usize, usize),
    min: [f32; 3],
    max: [f32; 3],
}

fn build_buffer(mesh: &Mesh) -> Buffer {
    let mut data = Vec::with_capacity(mesh.vertex_count() * 24 + mesh.triangle_count() * 12);
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];

    for vertex in &mesh.vertices {
        let p = [
            vertex.position.x as f32,
            vertex.position.y as f32,
            vertex.position.z as f32,
        ];
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
            data.extend_from_slice(&p[axis].to_le_bytes());
        }
    }
    let positions = (0, data.len());

    for vertex in &mesh.vertices {
        for value in [vertex.normal.x, vertex.normal.y, vertex.normal.z] {
            data.extend_from_slice(&(value as f32).to_le_bytes());
        }
    }
    let normals = (positions.1, data.len() - positions.1);

    let start = data.len();
    for triangle in &mesh.triangles {
        for &index in &triangle.indices {
            data.extend_from_slice(&(index as u32).to_le_bytes());
        }
    }
    let indices = (start, data.len() - start);

    Buffer {
        data,
        positions,
        normals,
        indices,
        min,
        max,
    }
}

fn build_document(mesh: &Mesh, buffer: &Buffer, uri: Option<&str>) -> serde_json::Value {
    let mut gltf_buffer = json!({ "byteLength": buffer.data.len() });
    if let Some(uri) = uri {
        gltf_buffer["uri"] = json!(uri);
    }

    json!({
        "asset": {
            "generator": concat!("scanalyzer ", env!("CARGO_PKG_VERSION")),
            "version": "2.0"
        },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1 },
                "indices": 2,
                "mode": 4
            }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": FLOAT,
                "count": mesh.vertex_count(),
                "type": "VEC3",
                "min": buffer.min,
                "max": buffer.max
            },
            {
                "bufferView": 1,
                "componentType": FLOAT,
                "count": mesh.vertex_count(),
                "type": "VEC3"
            },
            {
                "bufferView": 2,
                "componentType": UNSIGNED_INT,
                "count": mesh.triangle_count() * 3,
                "type": "SCALAR"
            }
        ],
        "bufferViews": [
            {
                "buffer": 0,
                "byteOffset": buffer.positions.0,
                "byteLength": buffer.positions.1,
                "target": ARRAY_BUFFER
            },
            {
                "buffer": 0,
                "byteOffset": buffer.normals.0,
                "byteLength": buffer.normals.1,
                "target": ARRAY_BUFFER
            },
            {
                "buffer": 0,
                "byteOffset": buffer.indices.0,
                "byteLength": buffer.indices.1,
                "target": ELEMENT_ARRAY_BUFFER
            }
        ],
        "buffers": [gltf_buffer]
    })
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_glb_layout() -> anyhow::Result<()> {
        let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();
        let file = NamedTempFile::with_suffix(".glb")?;

        export(&mesh, file.path())?;

        let bytes = std::fs::read(file.path())?;
        assert_eq!(&bytes[0..4], b"glTF");
        let declared = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        assert_eq!(declared as usize, bytes.len());
        assert_eq!(bytes.len() % 4, 0);

        let json_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
        let doc: serde_json::Value = serde_json::from_slice(&bytes[20..20 + json_len])?;
        assert_eq!(doc["accessors"][0]["count"], 8);
        assert_eq!(doc["accessors"][2]["count"], 36);
        assert_eq!(doc["accessors"][0]["min"][0], -5.0);
        // 8 positions + 8 normals (12 bytes each) + 36 indices
        assert_eq!(doc["buffers"][0]["byteLength"], 8 * 12 * 2 + 36 * 4);
        assert!(doc["buffers"][0].get("uri").is_none());
        Ok(())
    }

    #[test]
    fn test_gltf_writes_sibling_bin() -> anyhow::Result<()> {
        let mesh = Primitive::sphere(5.0, 8, 16).to_mesh();
        let dir = tempdir()?;
        let path = dir.path().join("ball.gltf");

        export(&mesh, &path)?;

        let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(doc["buffers"][0]["uri"], "ball.bin");
        let bin = std::fs::read(dir.path().join("ball.bin"))?;
        assert_eq!(doc["buffers"][0]["byteLength"], bin.len());
        Ok(())
    }
}
