//! Model import: file on disk to flat [`Mesh`] buffers.
//!
//! # Supported Formats
//!
//! | Format   | Extensions      | Notes |
//! |----------|-----------------|-------|
//! | OBJ      | `.obj`          | `o`/`g` start a new mesh; `l` and `p` give line/point primitives |
//! | STL      | `.stl`          | Binary and ASCII, face normals on every corner |
//! | glTF 2.0 | `.gltf`, `.glb` | One mesh per primitive |
//!
//! # Single-mesh scope
//!
//! A model file can hold several meshes. Only the **first** one, after
//! post-processing, is flattened into the returned [`Mesh`]; the rest are dropped
//! and their count is logged. This viewer draws exactly one object.
//!
//! # Example
//!
//! ```no_run
//! use bgview::{ImportFlags, import_mesh};
//!
//! let mesh = import_mesh("model.obj", ImportFlags::default())?;
//! println!("{} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());
//! # Ok::<(), bgview::ImportError>(())
//! ```

mod gltf;
mod obj;
pub(crate) mod post_process;
mod stl;

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use glam::{Vec2, Vec3};

use crate::error::ImportError;
use crate::mesh::Mesh;

bitflags! {
    /// Post-processing steps run on every mesh before flattening.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ImportFlags: u32 {
        /// Compute smooth per-vertex normals when the source has none.
        const GEN_SMOOTH_NORMALS = 1 << 0;
        /// Compute per-vertex tangents (requires normals and texture coordinates).
        const CALC_TANGENT_SPACE = 1 << 1;
        /// Split polygons into triangles.
        const TRIANGULATE = 1 << 2;
        /// Merge vertices whose attributes are identical.
        const JOIN_IDENTICAL_VERTICES = 1 << 3;
        /// Move point and line primitives into meshes of their own.
        const SORT_BY_PTYPE = 1 << 4;
    }
}

impl Default for ImportFlags {
    /// All five steps.
    fn default() -> Self {
        ImportFlags::all()
    }
}

/// Geometry as read from a file, before flattening.
#[derive(Clone, Debug, Default)]
pub(crate) struct SceneMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub tangents: Option<Vec<Vec3>>,
    /// Vertex indices per face; one index is a point, two a line.
    pub faces: Vec<Vec<u32>>,
}

impl SceneMesh {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Same vertex data, no faces.
    pub(crate) fn clone_vertices(&self) -> Self {
        Self {
            name: self.name.clone(),
            positions: self.positions.clone(),
            normals: self.normals.clone(),
            uvs: self.uvs.clone(),
            tangents: self.tangents.clone(),
            faces: Vec::new(),
        }
    }

    /// Bit pattern of every attribute of vertex `i`.
    pub(crate) fn vertex_key(&self, i: usize) -> Vec<u32> {
        let mut key = Vec::with_capacity(11);
        key.extend(self.positions[i].to_array().map(f32::to_bits));
        if let Some(normals) = &self.normals {
            key.extend(normals[i].to_array().map(f32::to_bits));
        }
        if let Some(uvs) = &self.uvs {
            key.extend(uvs[i].to_array().map(f32::to_bits));
        }
        if let Some(tangents) = &self.tangents {
            key.extend(tangents[i].to_array().map(f32::to_bits));
        }
        key
    }

    fn check_indices(&self) -> Result<(), ImportError> {
        let vertex_count = self.positions.len();
        for &index in self.faces.iter().flatten() {
            if index as usize >= vertex_count {
                return Err(ImportError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

/// All meshes read from one file, in file order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scene {
    pub meshes: Vec<SceneMesh>,
}

/// Imports the first mesh of the model at `path`.
///
/// The format is chosen by file extension, case-insensitively.
pub fn import_mesh(path: impl AsRef<Path>, flags: ImportFlags) -> Result<Mesh, ImportError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let scene = match ext.as_str() {
        "obj" => obj::read_file(path)?,
        "stl" => stl::read_file(path)?,
        "gltf" | "glb" => gltf::read_file(path)?,
        _ => return Err(ImportError::UnsupportedFormat(ext)),
    };

    process(scene, flags, path)
}

/// Imports the first mesh of Wavefront OBJ text.
pub fn import_obj_str(source: &str, flags: ImportFlags) -> Result<Mesh, ImportError> {
    let origin = Path::new("<memory>.obj");
    let scene = obj::parse(source, origin)?;
    process(scene, flags, origin)
}

/// Imports STL data (binary or ASCII) from memory.
pub fn import_stl_bytes(bytes: &[u8], flags: ImportFlags) -> Result<Mesh, ImportError> {
    let origin = Path::new("<memory>.stl");
    let mut cursor = std::io::Cursor::new(bytes);
    let scene = stl::parse(&mut cursor, origin)?;
    process(scene, flags, origin)
}

/// Imports glTF or GLB data with embedded buffers from memory.
pub fn import_gltf_slice(bytes: &[u8], flags: ImportFlags) -> Result<Mesh, ImportError> {
    let origin = Path::new("<memory>.glb");
    let scene = gltf::parse_slice(bytes, origin)?;
    process(scene, flags, origin)
}

fn process(mut scene: Scene, flags: ImportFlags, origin: &Path) -> Result<Mesh, ImportError> {
    for mesh in &scene.meshes {
        mesh.check_indices()?;
    }
    post_process::apply(&mut scene, flags);
    flatten_first(scene, origin)
}

/// Copies the first mesh into flat buffers, keeping only three-index faces.
fn flatten_first(scene: Scene, origin: &Path) -> Result<Mesh, ImportError> {
    let mut meshes = scene.meshes.into_iter();
    let Some(first) = meshes.next() else {
        return Err(ImportError::NoMeshes {
            path: PathBuf::from(origin),
        });
    };

    let ignored = meshes.count();
    if ignored > 0 {
        log::info!(
            "{}: using mesh '{}', ignoring {} further mesh(es)",
            origin.display(),
            first.name,
            ignored
        );
    }

    let mut mesh = Mesh {
        vertices: Vec::with_capacity(first.positions.len() * 3),
        normals: Vec::new(),
        indices: Vec::with_capacity(first.faces.len() * 3),
    };

    for p in &first.positions {
        mesh.vertices.extend_from_slice(&p.to_array());
    }

    if let Some(normals) = &first.normals {
        mesh.normals.reserve(normals.len() * 3);
        for n in normals {
            mesh.normals.extend_from_slice(&n.to_array());
        }
    }

    let mut skipped = 0usize;
    for face in &first.faces {
        if face.len() != 3 {
            skipped += 1;
            continue;
        }
        mesh.indices.extend_from_slice(face);
    }

    if skipped > 0 {
        log::warn!(
            "{}: skipped {} face(s) without exactly three indices",
            origin.display(),
            skipped
        );
    }

    if mesh.indices.is_empty() {
        return Err(ImportError::NoFaces {
            path: PathBuf::from(origin),
        });
    }

    log::info!(
        "{}: imported {} vertices, {} triangles{}",
        origin.display(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        if mesh.has_normals() { "" } else { " (no normals)" }
    );

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = include_str!("../../assets/cube.obj");

    #[test]
    fn cube_fixture_round_trip() {
        let mesh = import_mesh(
            concat!(env!("CARGO_MANIFEST_DIR"), "/assets/cube.obj"),
            ImportFlags::default(),
        )
        .unwrap();

        let n = 8;
        let m = 12;
        assert_eq!(mesh.vertices.len(), 3 * n);
        assert_eq!(mesh.normals.len(), 3 * n);
        assert_eq!(mesh.indices.len(), 3 * m);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < n));
        assert!(mesh.is_consistent());
    }

    #[test]
    fn without_join_every_corner_is_a_vertex() {
        let flags = ImportFlags::default() - ImportFlags::JOIN_IDENTICAL_VERTICES;
        let mesh = import_obj_str(CUBE, flags).unwrap();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn without_normal_generation_normals_are_absent() {
        let mesh = import_obj_str(CUBE, ImportFlags::TRIANGULATE).unwrap();
        assert!(!mesh.has_normals());
        assert_eq!(mesh.normals.len(), 0);
        assert!(mesh.is_consistent());
    }

    #[test]
    fn untriangulated_polygons_are_skipped() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\nf 1 2 3\n";
        let mesh = import_obj_str(src, ImportFlags::empty()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.indices, vec![4, 5, 6]);
    }

    #[test]
    fn only_first_mesh_is_used() {
        let src = "o first\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
                   o second\nv 0 0 1\nv 1 0 1\nv 0 1 1\nv 1 1 1\nf 4 5 6\nf 5 7 6\n";
        let mesh = import_obj_str(src, ImportFlags::default()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn lines_only_has_no_faces() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nl 1 2 3\n";
        let err = import_obj_str(src, ImportFlags::default()).unwrap_err();
        assert!(matches!(err, ImportError::NoFaces { .. }));
    }

    #[test]
    fn empty_source_has_no_meshes() {
        let err = import_obj_str("# nothing here\n", ImportFlags::default()).unwrap_err();
        assert!(matches!(err, ImportError::NoMeshes { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = import_mesh("model.fbx", ImportFlags::default()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(ext) if ext == "fbx"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = import_mesh("/nonexistent/model.obj", ImportFlags::default()).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[test]
    fn default_flags_enable_every_step() {
        let flags = ImportFlags::default();
        assert!(flags.contains(ImportFlags::GEN_SMOOTH_NORMALS));
        assert!(flags.contains(ImportFlags::CALC_TANGENT_SPACE));
        assert!(flags.contains(ImportFlags::TRIANGULATE));
        assert!(flags.contains(ImportFlags::JOIN_IDENTICAL_VERTICES));
        assert!(flags.contains(ImportFlags::SORT_BY_PTYPE));
    }
}
