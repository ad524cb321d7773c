//! Flattened mesh buffers produced by the importer.
//!
//! A [`Mesh`] is three flat arrays, the shape GPU upload wants:
//!
//! - `vertices`: `x, y, z` per vertex
//! - `normals`: `x, y, z` per vertex, or empty when the source had none
//! - `indices`: three per triangle, each `< vertex_count()`
//!
//! Positions can be adjusted after import with [`Mesh::recenter`] and
//! [`Mesh::fit_unit_cube`]; normals are left untouched by both.

use glam::Vec3;

/// Imported geometry, immutable once handed to the GPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// Checks the buffer-shape invariants.
    pub fn is_consistent(&self) -> bool {
        let n = self.vertex_count();
        self.vertices.len() % 3 == 0
            && self.indices.len() % 3 == 0
            && (self.normals.is_empty() || self.normals.len() == self.vertices.len())
            && self.indices.iter().all(|&i| (i as usize) < n)
    }

    /// Interleaves position and normal, 6 floats per vertex.
    ///
    /// Returns `None` when the mesh has no normals.
    pub fn interleaved_position_normal(&self) -> Option<Vec<f32>> {
        if !self.has_normals() {
            return None;
        }

        let mut out = Vec::with_capacity(self.vertices.len() * 2);
        for (p, n) in self.vertices.chunks_exact(3).zip(self.normals.chunks_exact(3)) {
            out.extend_from_slice(p);
            out.extend_from_slice(n);
        }
        Some(out)
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for p in self.vertices.chunks_exact(3) {
            let p = Vec3::from_slice(p);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Moves the bounding-box centre to the origin.
    pub fn recenter(&mut self) {
        if self.vertices.is_empty() {
            return;
        }
        let (min, max) = self.bounds();
        let center = (min + max) * 0.5;
        for p in self.vertices.chunks_exact_mut(3) {
            p[0] -= center.x;
            p[1] -= center.y;
            p[2] -= center.z;
        }
    }

    /// Scales positions uniformly so the largest extent is 1.
    pub fn fit_unit_cube(&mut self) {
        if self.vertices.is_empty() {
            return;
        }
        let (min, max) = self.bounds();
        let max_dim = (max - min).max_element();
        if max_dim > 0.0 {
            let factor = 1.0 / max_dim;
            for v in &mut self.vertices {
                *v *= factor;
            }
        }
    }
}
