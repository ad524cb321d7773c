//! Post-processing steps applied to every imported mesh before flattening.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use super::{ImportFlags, Scene, SceneMesh};

/// Runs the steps selected by `flags` in pipeline order.
pub(crate) fn apply(scene: &mut Scene, flags: ImportFlags) {
    if flags.contains(ImportFlags::TRIANGULATE) {
        for mesh in &mut scene.meshes {
            triangulate(mesh);
        }
    }

    if flags.contains(ImportFlags::SORT_BY_PTYPE) {
        sort_by_primitive_type(scene);
    }

    for mesh in &mut scene.meshes {
        if flags.contains(ImportFlags::GEN_SMOOTH_NORMALS) && mesh.normals.is_none() {
            generate_smooth_normals(mesh);
        }
        if flags.contains(ImportFlags::CALC_TANGENT_SPACE) {
            calc_tangent_space(mesh);
        }
        if flags.contains(ImportFlags::JOIN_IDENTICAL_VERTICES) {
            join_identical_vertices(mesh);
        }
    }
}

/// Splits polygons with more than three corners into a fan of triangles.
pub(crate) fn triangulate(mesh: &mut SceneMesh) {
    if mesh.faces.iter().all(|f| f.len() <= 3) {
        return;
    }

    let mut faces = Vec::with_capacity(mesh.faces.len() * 2);
    for face in mesh.faces.drain(..) {
        if face.len() <= 3 {
            faces.push(face);
            continue;
        }
        for i in 1..face.len() - 1 {
            faces.push(vec![face[0], face[i], face[i + 1]]);
        }
    }
    mesh.faces = faces;
}

/// Moves point and line primitives out of polygon meshes into meshes of their own,
/// appended after all polygon meshes.
pub(crate) fn sort_by_primitive_type(scene: &mut Scene) {
    let mut split_off = Vec::new();

    for mesh in &mut scene.meshes {
        let has_polygons = mesh.faces.iter().any(|f| f.len() >= 3);
        let has_other = mesh.faces.iter().any(|f| f.len() < 3);
        if !(has_polygons && has_other) {
            continue;
        }

        let (polygons, other): (Vec<_>, Vec<_>) =
            mesh.faces.drain(..).partition(|f| f.len() >= 3);
        mesh.faces = polygons;

        let (lines, points): (Vec<_>, Vec<_>) = other.into_iter().partition(|f| f.len() == 2);
        for (suffix, faces) in [("lines", lines), ("points", points)] {
            if faces.is_empty() {
                continue;
            }
            split_off.push(SceneMesh {
                name: format!("{}#{}", mesh.name, suffix),
                faces,
                ..mesh.clone_vertices()
            });
        }
    }

    if !split_off.is_empty() {
        log::debug!("Split {} point/line mesh(es) off polygon meshes", split_off.len());
    }

    let (mut polygon_meshes, mut other_meshes): (Vec<_>, Vec<_>) = scene
        .meshes
        .drain(..)
        .partition(|m| m.faces.iter().any(|f| f.len() >= 3));
    polygon_meshes.append(&mut other_meshes);
    polygon_meshes.append(&mut split_off);
    scene.meshes = polygon_meshes;
}

fn position_key(p: Vec3) -> [u32; 3] {
    // Treat -0.0 and 0.0 as the same position
    let p = p + Vec3::ZERO;
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Newell's method; the length is twice the polygon area.
fn face_normal(positions: &[Vec3], face: &[u32]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, &a) in face.iter().enumerate() {
        let b = face[(i + 1) % face.len()];
        let (pa, pb) = (positions[a as usize], positions[b as usize]);
        n.x += (pa.y - pb.y) * (pa.z + pb.z);
        n.y += (pa.z - pb.z) * (pa.x + pb.x);
        n.z += (pa.x - pb.x) * (pa.y + pb.y);
    }
    n
}

/// Area-weighted normals averaged over every face touching the same position,
/// so duplicated corners at one position share a smooth normal.
pub(crate) fn generate_smooth_normals(mesh: &mut SceneMesh) {
    let mut accumulated: HashMap<[u32; 3], Vec3> = HashMap::new();

    for face in mesh.faces.iter().filter(|f| f.len() >= 3) {
        let n = face_normal(&mesh.positions, face);
        for &i in face {
            *accumulated
                .entry(position_key(mesh.positions[i as usize]))
                .or_insert(Vec3::ZERO) += n;
        }
    }

    let normals = mesh
        .positions
        .iter()
        .map(|&p| {
            accumulated
                .get(&position_key(p))
                .copied()
                .unwrap_or(Vec3::ZERO)
                .normalize_or_zero()
        })
        .collect();

    log::debug!("Generated smooth normals for mesh '{}'", mesh.name);
    mesh.normals = Some(normals);
}

/// Per-vertex tangents from texture-coordinate gradients, orthogonalized against
/// the normal. Needs both normals and texture coordinates.
pub(crate) fn calc_tangent_space(mesh: &mut SceneMesh) {
    let (Some(normals), Some(uvs)) = (&mesh.normals, &mesh.uvs) else {
        log::debug!(
            "Skipping tangent space for mesh '{}': needs normals and texture coordinates",
            mesh.name
        );
        return;
    };

    let mut tangents = vec![Vec3::ZERO; mesh.positions.len()];

    for face in mesh.faces.iter().filter(|f| f.len() == 3) {
        let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
        let e1 = mesh.positions[b] - mesh.positions[a];
        let e2 = mesh.positions[c] - mesh.positions[a];
        let d1: Vec2 = uvs[b] - uvs[a];
        let d2: Vec2 = uvs[c] - uvs[a];

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let t = (e1 * d2.y - e2 * d1.y) / det;
        for i in [a, b, c] {
            tangents[i] += t;
        }
    }

    for (t, n) in tangents.iter_mut().zip(normals) {
        *t = (*t - *n * n.dot(*t)).normalize_or_zero();
    }

    mesh.tangents = Some(tangents);
}

/// Collapses vertices whose every attribute is bit-identical and remaps faces.
pub(crate) fn join_identical_vertices(mesh: &mut SceneMesh) {
    let count = mesh.positions.len();
    let mut lookup: HashMap<Vec<u32>, u32> = HashMap::with_capacity(count);
    let mut remap = Vec::with_capacity(count);
    let mut kept = Vec::new();

    for i in 0..count {
        let key = mesh.vertex_key(i);
        let next = kept.len() as u32;
        let index = *lookup.entry(key).or_insert_with(|| {
            kept.push(i);
            next
        });
        remap.push(index);
    }

    if kept.len() == count {
        return;
    }

    log::debug!(
        "Joined identical vertices in mesh '{}': {} -> {}",
        mesh.name,
        count,
        kept.len()
    );

    mesh.positions = kept.iter().map(|&i| mesh.positions[i]).collect();
    if let Some(normals) = &mut mesh.normals {
        *normals = kept.iter().map(|&i| normals[i]).collect();
    }
    if let Some(uvs) = &mut mesh.uvs {
        *uvs = kept.iter().map(|&i| uvs[i]).collect();
    }
    if let Some(tangents) = &mut mesh.tangents {
        *tangents = kept.iter().map(|&i| tangents[i]).collect();
    }
    for face in &mut mesh.faces {
        for index in face.iter_mut() {
            *index = remap[*index as usize];
        }
    }
}
