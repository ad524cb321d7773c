//! # bgview
//!
//! **A textured background plane behind a lit, mouse-rotatable 3D mesh.**
//!
//! The viewer imports one mesh from a model file, uploads it next to a background
//! image, and redraws only when a drag changes the rotation or the window resizes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bgview::{ViewerConfig, run};
//!
//! fn main() -> Result<(), bgview::InitError> {
//!     run(ViewerConfig::new("model.obj")
//!         .background("photo.jpg")
//!         .center(true)
//!         .fit(true))
//! }
//! ```
//!
//! ## Pieces
//!
//! - [`import_mesh`] turns OBJ, STL or glTF into flat [`Mesh`] buffers.
//! - [`ViewState`] holds the rotation ([`RotationState`], 1/16 degree units) and clear color.
//! - [`InputController`] maps pointer drags onto the view and reports clicks.
//! - [`GpuResourceSet`] and [`FrameRenderer`] draw through any [`RenderBackend`];
//!   [`GpuContext`] is the wgpu one.

mod app;
mod backend;
mod config;
mod error;
mod gpu;
mod import;
mod input;
mod mesh;
mod renderer;
mod resources;
mod rotation;
mod shaders;
mod texture;
mod transforms;
mod view;

pub use app::run;
pub use backend::{
    AttributeBinding, Blend, DrawDesc, FrameDesc, GeometryDesc, PassDesc, Primitive, ProgramDesc,
    ProgramKind, RenderBackend, VertexLayout,
};
pub use config::{Args, MIN_WINDOW_SIZE, ViewerConfig};
pub use error::{ImportError, InitError, ResourceError, ShaderError, ShaderStage};
pub use gpu::{GpuContext, GpuGeometry, GpuProgram};
pub use import::{ImportFlags, import_gltf_slice, import_mesh, import_obj_str, import_stl_bytes};
pub use input::{DRAG_SENSITIVITY, DragState, InputController, PointerButton};
pub use mesh::Mesh;
pub use renderer::{BackgroundUniforms, FrameRenderer, ObjectUniforms};
pub use resources::{BackgroundImage, BackgroundQuad, GpuResourceSet};
pub use rotation::{FULL_TURN, RotationState, normalize_angle};
pub use shaders::{ProgramSource, ShaderLibrary};
pub use texture::Texture;
pub use transforms::{
    background_matrix, camera_matrix, normal_matrix, perspective, world_matrix,
};
pub use view::{Color, ViewState};

// Re-export glam math types for convenience
pub use glam::{Mat3, Mat4, Vec3};
