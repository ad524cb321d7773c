//! Per-frame matrix computation and the two draw passes.
//!
//! Every frame is two passes against the same target:
//!
//! 1. **Background**: clear color and depth, draw the textured unit quad through an
//!    orthographic matrix.
//! 2. **Object**: keep the color, clear depth again so the quad never occludes the
//!    mesh, draw the lit mesh with alpha blending.

use glam::{Mat3, Mat4};

use crate::backend::{DrawDesc, FrameDesc, PassDesc, RenderBackend};
use crate::resources::GpuResourceSet;
use crate::transforms;
use crate::view::{Color, ViewState};

/// Uniform block of the background program.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BackgroundUniforms {
    pub matrix: [[f32; 4]; 4],
}

/// Uniform block of the object program. Matches WGSL uniform layout rules:
/// `mat3x3` columns are padded to 16 bytes and `vec3` is followed by a pad float.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    pub proj: [[f32; 4]; 4],
    /// Camera times world.
    pub model_view: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 3],
    pub light_pos: [f32; 3],
    pub _pad: f32,
    pub color: [f32; 4],
}

impl ObjectUniforms {
    pub fn new(proj: Mat4, model_view: Mat4, normal_matrix: Mat3, color: Color) -> Self {
        let pad = |c: glam::Vec3| [c.x, c.y, c.z, 0.0];
        Self {
            proj: proj.to_cols_array_2d(),
            model_view: model_view.to_cols_array_2d(),
            normal_matrix: [
                pad(normal_matrix.x_axis),
                pad(normal_matrix.y_axis),
                pad(normal_matrix.z_axis),
            ],
            light_pos: transforms::LIGHT_POSITION.to_array(),
            _pad: 0.0,
            color: color.to_array(),
        }
    }
}

/// Issues the background and object passes for a [`ViewState`].
///
/// Holds the projection, which only changes on [`resize`](Self::resize).
pub struct FrameRenderer {
    projection: Mat4,
    width: u32,
    height: u32,
    object_color: Color,
}

impl FrameRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            projection: transforms::perspective(width, height),
            width,
            height,
            object_color: Color::MESH_GREEN,
        }
    }

    pub fn with_object_color(mut self, color: Color) -> Self {
        self.object_color = color;
        self
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Recomputes the projection and resizes the viewport. Zero sizes (a minimized
    /// window) are ignored.
    pub fn resize<B: RenderBackend>(&mut self, backend: &mut B, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.projection = transforms::perspective(width, height);
        backend.set_viewport(width, height);
    }

    /// Draws one frame.
    pub fn render<B: RenderBackend>(
        &self,
        backend: &mut B,
        resources: &GpuResourceSet<B>,
        view: &ViewState,
    ) {
        let background = BackgroundUniforms {
            matrix: transforms::background_matrix().to_cols_array_2d(),
        };

        let world = transforms::world_matrix(view.rotation());
        let object = ObjectUniforms::new(
            self.projection,
            transforms::camera_matrix() * world,
            transforms::normal_matrix(&world),
            self.object_color,
        );

        let frame = FrameDesc {
            passes: vec![
                PassDesc {
                    clear_color: Some(view.clear_color()),
                    clear_depth: true,
                    draw: DrawDesc {
                        program: &resources.background_program,
                        geometry: &resources.background_quad,
                        uniforms: bytemuck::bytes_of(&background),
                    },
                },
                PassDesc {
                    clear_color: None,
                    clear_depth: true,
                    draw: DrawDesc {
                        program: &resources.object_program,
                        geometry: &resources.object_geometry,
                        uniforms: bytemuck::bytes_of(&object),
                    },
                },
            ],
        };

        backend.render(&frame);
    }
}
