//! glTF 2.0 reader (`.gltf` with external or embedded buffers, and `.glb`).
//!
//! Each mesh primitive becomes one [`SceneMesh`], in document order. Strips,
//! fans and loops are expanded to plain triangles and line segments here so the
//! rest of the pipeline only sees lists.

use std::path::Path;

use glam::{Vec2, Vec3};
use gltf::mesh::Mode;

use super::{Scene, SceneMesh};
use crate::error::ImportError;

pub(super) fn read_file(path: &Path) -> Result<Scene, ImportError> {
    let (document, buffers, _images) = gltf::import(path).map_err(|e| map_error(e, path))?;
    Ok(convert(&document, &buffers))
}

pub(super) fn parse_slice(bytes: &[u8], path: &Path) -> Result<Scene, ImportError> {
    let (document, buffers, _images) = gltf::import_slice(bytes).map_err(|e| map_error(e, path))?;
    Ok(convert(&document, &buffers))
}

fn map_error(error: gltf::Error, path: &Path) -> ImportError {
    match error {
        gltf::Error::Io(source) => ImportError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => ImportError::Parse {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

fn convert(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Scene {
    let mut scene = Scene::default();

    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh{}", mesh.index()));

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

            let Some(positions) = reader.read_positions() else {
                log::warn!(
                    "glTF mesh '{}' primitive {} has no positions, skipping",
                    mesh_name,
                    primitive.index()
                );
                continue;
            };

            let mut out = SceneMesh::new(if mesh.primitives().len() > 1 {
                format!("{}.{}", mesh_name, primitive.index())
            } else {
                mesh_name.clone()
            });
            out.positions = positions.map(Vec3::from).collect();
            out.normals = reader.read_normals().map(|n| n.map(Vec3::from).collect());
            out.uvs = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().map(Vec2::from).collect());

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..out.positions.len() as u32).collect(),
            };
            out.faces = assemble(primitive.mode(), &indices);

            scene.meshes.push(out);
        }
    }

    scene
}

/// Expands a primitive's index stream into list faces.
fn assemble(mode: Mode, indices: &[u32]) -> Vec<Vec<u32>> {
    match mode {
        Mode::Points => indices.iter().map(|&i| vec![i]).collect(),
        Mode::Lines => indices.chunks_exact(2).map(<[u32]>::to_vec).collect(),
        Mode::LineStrip => indices.windows(2).map(<[u32]>::to_vec).collect(),
        Mode::LineLoop => {
            let mut faces: Vec<Vec<u32>> = indices.windows(2).map(<[u32]>::to_vec).collect();
            if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                if indices.len() > 2 {
                    faces.push(vec![last, first]);
                }
            }
            faces
        }
        Mode::Triangles => indices.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => (0..indices.len().saturating_sub(2))
            .map(|i| {
                // Odd triangles swap their first two corners to keep the winding
                if i % 2 == 0 {
                    vec![indices[i], indices[i + 1], indices[i + 2]]
                } else {
                    vec![indices[i + 1], indices[i], indices[i + 2]]
                }
            })
            .collect(),
        Mode::TriangleFan => (1..indices.len().saturating_sub(1))
            .map(|i| vec![indices[0], indices[i], indices[i + 1]])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Four positions: (0,0,0) (1,0,0) (0,1,0) (1,1,0)
    const QUAD_BUFFER: &str = "data:application/octet-stream;base64,\
        AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAACAPwAAgD8AAAAA";

    fn document(count: u32, mode: u32) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "buffers": [{{ "byteLength": 48, "uri": "{QUAD_BUFFER}" }}],
  "bufferViews": [{{ "buffer": 0, "byteLength": 48 }}],
  "accessors": [{{
    "bufferView": 0, "componentType": 5126, "count": {count}, "type": "VEC3",
    "min": [0, 0, 0], "max": [1, 1, 0]
  }}],
  "meshes": [{{
    "name": "plate",
    "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "mode": {mode} }}]
  }}]
}}"#
        )
    }

    #[test]
    fn unindexed_triangle_list() {
        let scene = parse_slice(document(3, 4).as_bytes(), Path::new("t.gltf")).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.name, "plate");
        assert_eq!(mesh.positions.len(), 3);
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn strip_is_expanded() {
        let scene = parse_slice(document(4, 5).as_bytes(), Path::new("t.gltf")).unwrap();
        assert_eq!(scene.meshes[0].faces, vec![vec![0, 1, 2], vec![2, 1, 3]]);
    }

    #[test]
    fn public_entry_point_generates_normals() {
        let mesh = crate::import::import_gltf_slice(
            document(4, 5).as_bytes(),
            crate::ImportFlags::default(),
        )
        .unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.has_normals());
    }

    #[test]
    fn garbage_is_parse_error() {
        let err = parse_slice(b"not a gltf", Path::new("t.gltf")).unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
    }

    #[test]
    fn assemble_modes() {
        let idx = [0, 1, 2, 3];
        assert_eq!(assemble(Mode::Points, &idx).len(), 4);
        assert_eq!(assemble(Mode::Lines, &idx), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(assemble(Mode::LineStrip, &idx).len(), 3);
        assert_eq!(assemble(Mode::LineLoop, &idx).last(), Some(&vec![3, 0]));
        assert_eq!(
            assemble(Mode::TriangleFan, &idx),
            vec![vec![0, 1, 2], vec![0, 2, 3]]
        );
    }
}
