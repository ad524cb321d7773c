//! STL reader (binary and ASCII) on top of `stl_io`.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use glam::Vec3;

use super::{Scene, SceneMesh};
use crate::error::ImportError;

pub(super) fn read_file(path: &Path) -> Result<Scene, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&mut BufReader::new(file), path)
}

/// Every triangle gets three vertices carrying the facet normal. Facets stored
/// with a zero normal get one computed from their winding.
pub(super) fn parse<R: Read + Seek>(reader: &mut R, path: &Path) -> Result<Scene, ImportError> {
    let stl = stl_io::read_stl(reader).map_err(|e| ImportError::Parse {
        path: path.to_path_buf(),
        message: format!("STL parse error: {e}"),
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("stl")
        .to_string();

    let mut mesh = SceneMesh::new(name);
    mesh.positions.reserve(stl.faces.len() * 3);
    let mut normals = Vec::with_capacity(stl.faces.len() * 3);
    let mut recomputed = 0usize;

    for face in &stl.faces {
        let mut corners = [Vec3::ZERO; 3];
        for (corner, &vertex_idx) in corners.iter_mut().zip(&face.vertices) {
            let Some(vertex) = stl.vertices.get(vertex_idx) else {
                return Err(ImportError::IndexOutOfRange {
                    index: vertex_idx as u32,
                    vertex_count: stl.vertices.len(),
                });
            };
            let position: [f32; 3] = (*vertex).into();
            *corner = Vec3::from(position);
        }

        let stored: [f32; 3] = face.normal.into();
        let mut normal = Vec3::from(stored);
        if normal.length_squared() <= f32::EPSILON {
            normal = (corners[1] - corners[0])
                .cross(corners[2] - corners[0])
                .normalize_or_zero();
            recomputed += 1;
        }

        let base = mesh.positions.len() as u32;
        mesh.positions.extend_from_slice(&corners);
        normals.extend_from_slice(&[normal; 3]);
        mesh.faces.push(vec![base, base + 1, base + 2]);
    }

    if recomputed > 0 {
        log::debug!("{}: computed {} missing facet normal(s)", path.display(), recomputed);
    }

    mesh.normals = Some(normals);

    let mut scene = Scene::default();
    if !mesh.faces.is_empty() {
        scene.meshes.push(mesh);
    }
    Ok(scene)
}
