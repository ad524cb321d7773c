//! Wavefront OBJ reader.
//!
//! Handles `v`, `vt`, `vn`, `f`, `l`, `p`, `o` and `g`. Every face corner becomes
//! its own vertex; duplicates are merged later by post-processing. Material and
//! smoothing-group statements are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};

use super::{Scene, SceneMesh};
use crate::error::ImportError;

pub(super) fn read_file(path: &Path) -> Result<Scene, ImportError> {
    let source = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&source, path)
}

pub(super) fn parse(source: &str, path: &Path) -> Result<Scene, ImportError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();

    let mut scene = Scene::default();
    let mut current = MeshBuilder::new("default");

    for (line_no, raw) in source.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let err = |message: String| ImportError::Parse {
            path: PathBuf::from(path),
            message: format!("line {line_no}: {message}"),
        };

        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => positions.push(Vec3::from(parse_floats::<3>(&mut tokens).map_err(err)?)),
            "vn" => normals.push(Vec3::from(parse_floats::<3>(&mut tokens).map_err(err)?)),
            "vt" => uvs.push(parse_uv(&mut tokens).map_err(err)?),
            "o" | "g" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                let name = if name.is_empty() { "default".to_string() } else { name };
                if current.has_faces() {
                    let finished = std::mem::replace(&mut current, MeshBuilder::new(&name));
                    scene.meshes.push(finished.finish());
                } else {
                    current.mesh.name = name;
                }
            }
            "f" | "l" | "p" => {
                let mut corners = Vec::new();
                for token in tokens {
                    let corner = parse_corner(token, positions.len(), uvs.len(), normals.len())
                        .map_err(err)?;
                    corners.push(current.push_corner(&positions, &uvs, &normals, corner));
                }

                let needed = match keyword {
                    "f" => 3,
                    "l" => 2,
                    _ => 1,
                };
                if corners.len() < needed {
                    return Err(err(format!(
                        "'{keyword}' needs at least {needed} vertices, found {}",
                        corners.len()
                    )));
                }

                match keyword {
                    "f" => current.mesh.faces.push(corners),
                    "l" => {
                        for pair in corners.windows(2) {
                            current.mesh.faces.push(pair.to_vec());
                        }
                    }
                    _ => {
                        for index in corners {
                            current.mesh.faces.push(vec![index]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if current.has_faces() {
        scene.meshes.push(current.finish());
    }

    Ok(scene)
}

/// Zero-based indices of one face corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Accumulates per-corner vertices for the mesh being read.
struct MeshBuilder {
    mesh: SceneMesh,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    with_normal: usize,
    with_uv: usize,
}

impl MeshBuilder {
    fn new(name: &str) -> Self {
        Self {
            mesh: SceneMesh::new(name),
            normals: Vec::new(),
            uvs: Vec::new(),
            with_normal: 0,
            with_uv: 0,
        }
    }

    fn has_faces(&self) -> bool {
        !self.mesh.faces.is_empty()
    }

    fn push_corner(&mut self, positions: &[Vec3], uvs: &[Vec2], normals: &[Vec3], c: Corner) -> u32 {
        let index = self.mesh.positions.len() as u32;
        self.mesh.positions.push(positions[c.position]);

        self.uvs.push(c.uv.map_or(Vec2::ZERO, |i| uvs[i]));
        self.with_uv += usize::from(c.uv.is_some());

        self.normals.push(c.normal.map_or(Vec3::ZERO, |i| normals[i]));
        self.with_normal += usize::from(c.normal.is_some());

        index
    }

    fn finish(mut self) -> SceneMesh {
        let count = self.mesh.positions.len();

        if self.with_normal == count {
            self.mesh.normals = Some(self.normals);
        } else if self.with_normal > 0 {
            log::warn!(
                "Mesh '{}': only {} of {} corners have normals, ignoring them",
                self.mesh.name,
                self.with_normal,
                count
            );
        }

        if self.with_uv == count {
            self.mesh.uvs = Some(self.uvs);
        }

        self.mesh
    }
}

fn parse_floats<'a, const N: usize>(
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<[f32; N], String> {
    let mut out = [0.0; N];
    for slot in &mut out {
        let token = tokens
            .next()
            .ok_or_else(|| format!("expected {N} numbers"))?;
        *slot = token
            .parse()
            .map_err(|_| format!("invalid number '{token}'"))?;
    }
    Ok(out)
}

/// Reads `u [v [w]]`; a missing `v` is 0 and `w` is ignored.
fn parse_uv<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<Vec2, String> {
    let [u] = parse_floats::<1>(tokens)?;
    let v = match tokens.next() {
        Some(token) => token
            .parse()
            .map_err(|_| format!("invalid number '{token}'"))?,
        None => 0.0,
    };
    Ok(Vec2::new(u, v))
}

/// Parses `v`, `v/vt`, `v//vn` or `v/vt/vn`.
fn parse_corner(
    token: &str,
    position_count: usize,
    uv_count: usize,
    normal_count: usize,
) -> Result<Corner, String> {
    let mut parts = token.split('/');
    let position = match parts.next() {
        Some(p) if !p.is_empty() => resolve_index(p, position_count, "vertex")?,
        _ => return Err(format!("malformed face vertex '{token}'")),
    };
    let uv = match parts.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, uv_count, "texture coordinate")?),
        _ => None,
    };
    let normal = match parts.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, normal_count, "normal")?),
        _ => None,
    };
    Ok(Corner {
        position,
        uv,
        normal,
    })
}

/// Converts a one-based (or negative, relative) OBJ index to zero-based.
fn resolve_index(token: &str, count: usize, what: &str) -> Result<usize, String> {
    let raw: i64 = token
        .parse()
        .map_err(|_| format!("invalid {what} index '{token}'"))?;

    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r as usize - 1),
        r => count.checked_sub(r.unsigned_abs() as usize),
    };

    match resolved {
        Some(i) if i < count => Ok(i),
        _ => Err(format!(
            "{what} index {raw} does not refer to one of the {count} defined so far"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(src: &str) -> Result<Scene, ImportError> {
        parse(src, Path::new("test.obj"))
    }

    #[test]
    fn reads_positions_normals_and_uvs() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
";
        let scene = parse_str(src).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.normals.as_ref().unwrap(), &vec![Vec3::Z; 3]);
        assert_eq!(mesh.uvs.as_ref().unwrap()[1], Vec2::new(1.0, 0.0));
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn accepts_every_corner_form() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf 1 2/1 3//1\n";
        let mesh = &parse_str(src).unwrap().meshes[0];
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
        // Mixed corners: neither attribute covers every vertex
        assert!(mesh.normals.is_none());
        assert!(mesh.uvs.is_none());
    }

    #[test]
    fn texture_coordinate_v_is_optional() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5\nvt 0.25 0.5 1\nvt 0.75\nf 1/1 2/2 3/3\n";
        let mesh = &parse_str(src).unwrap().meshes[0];
        assert_eq!(
            mesh.uvs.as_ref().unwrap(),
            &vec![Vec2::new(0.5, 0.0), Vec2::new(0.25, 0.5), Vec2::new(0.75, 0.0)]
        );
    }

    #[test]
    fn texture_coordinate_needs_u() {
        let err = parse_str("vt\n").unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
    }

    #[test]
    fn negative_indices_are_relative() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = &parse_str(src).unwrap().meshes[0];
        assert_eq!(mesh.positions[2], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn objects_split_meshes() {
        let src = "o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no b\nf 3 2 1\n";
        let scene = parse_str(src).unwrap();
        let names: Vec<&str> = scene.meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn lines_and_points_become_short_faces() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nl 1 2 3\np 1\n";
        let mesh = &parse_str(src).unwrap().meshes[0];
        let lens: Vec<usize> = mesh.faces.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![2, 2, 1]);
    }

    #[test]
    fn undefined_vertex_reports_line() {
        let err = parse_str("v 0 0 0\n\nf 1 2 3\n").unwrap_err();
        match err {
            ImportError::Parse { message, .. } => assert!(message.starts_with("line 3:")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_number_is_parse_error() {
        let err = parse_str("v 0 zero 0\n").unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
    }

    #[test]
    fn comments_and_unknown_statements_are_ignored() {
        let src = "# header\nmtllib x.mtl\nv 0 0 0 # origin\nv 1 0 0\nv 0 1 0\nusemtl red\ns 1\nf 1 2 3\n";
        let scene = parse_str(src).unwrap();
        assert_eq!(scene.meshes[0].faces.len(), 1);
    }
}
