//! The GPU capability the viewer renders through.
//!
//! [`RenderBackend`] is the minimal surface the core needs from a graphics API:
//! build shader programs, upload vertex data and textures, bind a texture to its
//! program once, size the viewport, and execute a frame of clear + draw passes. [`GpuContext`](crate::GpuContext) implements
//! it on wgpu; tests implement it with a recorder.
//!
//! # Attribute slots
//!
//! Both passes share one device, so their vertex attributes use disjoint shader
//! locations. The table lives in [`AttributeBinding`]:
//!
//! | Pass       | Attribute | Components | Offset (floats) | Location |
//! |------------|-----------|------------|-----------------|----------|
//! | background | position  | 3          | 0               | 0        |
//! | background | texcoord  | 2          | 3               | 1        |
//! | object     | position  | 3          | 0               | 2        |
//! | object     | normal    | 3          | 3               | 3        |

use crate::error::{ResourceError, ShaderError};
use crate::view::Color;

/// The two programs the viewer builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Textured unit quad behind everything.
    Background,
    /// Lit, rotatable mesh.
    Object,
}

impl std::fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramKind::Background => write!(f, "background"),
            ProgramKind::Object => write!(f, "object"),
        }
    }
}

/// Every vertex attribute either pass reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeBinding {
    BackgroundPosition,
    BackgroundTexCoord,
    ObjectPosition,
    ObjectNormal,
}

impl AttributeBinding {
    /// Shader location the attribute is bound to.
    pub const fn location(self) -> u32 {
        match self {
            AttributeBinding::BackgroundPosition => 0,
            AttributeBinding::BackgroundTexCoord => 1,
            AttributeBinding::ObjectPosition => 2,
            AttributeBinding::ObjectNormal => 3,
        }
    }

    /// Number of `f32` components.
    pub const fn components(self) -> usize {
        match self {
            AttributeBinding::BackgroundTexCoord => 2,
            _ => 3,
        }
    }

    /// Offset inside one interleaved record, in floats.
    pub const fn offset_floats(self) -> usize {
        match self {
            AttributeBinding::BackgroundPosition | AttributeBinding::ObjectPosition => 0,
            AttributeBinding::BackgroundTexCoord | AttributeBinding::ObjectNormal => 3,
        }
    }
}

/// Interleaved `f32` vertex layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride_floats: usize,
    pub attributes: &'static [AttributeBinding],
}

impl VertexLayout {
    /// Position + texcoord, 5 floats per vertex.
    pub const BACKGROUND: VertexLayout = VertexLayout {
        stride_floats: 5,
        attributes: &[
            AttributeBinding::BackgroundPosition,
            AttributeBinding::BackgroundTexCoord,
        ],
    };

    /// Position + normal, 6 floats per vertex.
    pub const OBJECT: VertexLayout = VertexLayout {
        stride_floats: 6,
        attributes: &[AttributeBinding::ObjectPosition, AttributeBinding::ObjectNormal],
    };

    pub const fn stride_bytes(&self) -> u64 {
        (self.stride_floats * std::mem::size_of::<f32>()) as u64
    }
}

/// How fragments of a program combine with what is already in the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    Replace,
    /// Standard source-alpha over compositing.
    AlphaOver,
}

/// Everything needed to build one program.
#[derive(Clone, Copy, Debug)]
pub struct ProgramDesc<'a> {
    pub kind: ProgramKind,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub layout: VertexLayout,
    /// Size in bytes of the program's uniform block.
    pub uniform_size: u64,
    /// Whether the program samples a texture bound next to its uniforms.
    pub textured: bool,
    pub blend: Blend,
}

/// Primitive assembly for uploaded geometry.
#[derive(Clone, Copy, Debug)]
pub enum Primitive<'a> {
    /// Triangle fan over the first `vertex_count` vertices.
    TriangleFan { vertex_count: u32 },
    /// Indexed triangle list, three indices per triangle.
    Triangles { indices: &'a [u32] },
}

impl Primitive<'_> {
    /// Number of triangles this primitive assembles.
    pub fn triangle_count(&self) -> u32 {
        match self {
            Primitive::TriangleFan { vertex_count } => vertex_count.saturating_sub(2),
            Primitive::Triangles { indices } => (indices.len() / 3) as u32,
        }
    }
}

/// Vertex data to upload once at initialization.
#[derive(Clone, Copy, Debug)]
pub struct GeometryDesc<'a> {
    pub label: &'a str,
    pub layout: VertexLayout,
    pub vertices: &'a [f32],
    pub primitive: Primitive<'a>,
}

/// One draw call.
pub struct DrawDesc<'a, B: RenderBackend + ?Sized> {
    pub program: &'a B::Program,
    pub geometry: &'a B::Geometry,
    /// Raw uniform block, laid out as the program's shaders expect.
    pub uniforms: &'a [u8],
}

/// A pass: optional clears, then a single draw.
pub struct PassDesc<'a, B: RenderBackend + ?Sized> {
    /// `Some` clears the color target, `None` keeps what earlier passes drew.
    pub clear_color: Option<Color>,
    pub clear_depth: bool,
    pub draw: DrawDesc<'a, B>,
}

/// Passes executed in order against the current frame.
pub struct FrameDesc<'a, B: RenderBackend + ?Sized> {
    pub passes: Vec<PassDesc<'a, B>>,
}

/// GPU services the core relies on.
///
/// Resources are returned by value and released when dropped, so their owner
/// controls teardown order relative to the device.
pub trait RenderBackend {
    type Program;
    type Geometry;
    type Texture;

    fn compile_program(&mut self, desc: &ProgramDesc<'_>) -> Result<Self::Program, ShaderError>;

    fn upload_geometry(&mut self, desc: &GeometryDesc<'_>) -> Result<Self::Geometry, ResourceError>;

    /// Uploads an RGBA image sampled with nearest-neighbor filtering.
    fn upload_texture(
        &mut self,
        image: &image::RgbaImage,
        label: &str,
    ) -> Result<Self::Texture, ResourceError>;

    /// Attaches `texture` to a textured program. Every later draw with the program
    /// samples it; nothing is rebound per frame.
    fn bind_texture(&mut self, program: &mut Self::Program, texture: &Self::Texture);

    /// Resizes the drawable area. Takes effect from the next frame.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Executes one frame. Steady-state rendering has no error path.
    fn render(&mut self, frame: &FrameDesc<'_, Self>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_slots_do_not_alias_across_passes() {
        let background: Vec<u32> = VertexLayout::BACKGROUND
            .attributes
            .iter()
            .map(|a| a.location())
            .collect();
        let object: Vec<u32> = VertexLayout::OBJECT
            .attributes
            .iter()
            .map(|a| a.location())
            .collect();

        assert_eq!(background, vec![0, 1]);
        assert_eq!(object, vec![2, 3]);
    }

    #[test]
    fn layouts_fill_their_stride() {
        for layout in [VertexLayout::BACKGROUND, VertexLayout::OBJECT] {
            let used: usize = layout.attributes.iter().map(|a| a.components()).sum();
            assert_eq!(used, layout.stride_floats);
            for attr in layout.attributes {
                assert!(attr.offset_floats() + attr.components() <= layout.stride_floats);
            }
        }
        assert_eq!(VertexLayout::BACKGROUND.stride_bytes(), 20);
        assert_eq!(VertexLayout::OBJECT.stride_bytes(), 24);
    }

    #[test]
    fn fan_of_four_is_two_triangles() {
        assert_eq!(Primitive::TriangleFan { vertex_count: 4 }.triangle_count(), 2);
        assert_eq!(
            Primitive::Triangles { indices: &[0, 1, 2, 2, 3, 0] }.triangle_count(),
            2
        );
    }
}

/// A [`RenderBackend`] that records every call instead of touching a GPU.
#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use crate::error::ShaderStage;

    #[derive(Clone, Debug, PartialEq)]
    pub struct RecordedGeometry {
        pub label: String,
        pub vertex_count: usize,
        pub triangle_count: u32,
        pub indexed: bool,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RecordedTexture {
        pub width: u32,
        pub height: u32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RecordedProgram {
        pub kind: ProgramKind,
        pub texture: Option<RecordedTexture>,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct RecordedPass {
        pub clear_color: Option<Color>,
        pub clear_depth: bool,
        pub program: ProgramKind,
        pub geometry: String,
        pub texture: Option<RecordedTexture>,
        pub uniforms: Vec<u8>,
    }

    #[derive(Default)]
    pub struct RecordingBackend {
        pub programs: Vec<(ProgramKind, Blend, bool)>,
        pub geometries: Vec<RecordedGeometry>,
        pub textures: Vec<RecordedTexture>,
        pub bound_textures: Vec<(ProgramKind, RecordedTexture)>,
        pub viewport: Option<(u32, u32)>,
        pub frames: Vec<Vec<RecordedPass>>,
        /// Makes `compile_program` fail for this program at this stage.
        pub fail: Option<(ProgramKind, ShaderStage)>,
    }

    impl RenderBackend for RecordingBackend {
        type Program = RecordedProgram;
        type Geometry = RecordedGeometry;
        type Texture = RecordedTexture;

        fn compile_program(
            &mut self,
            desc: &ProgramDesc<'_>,
        ) -> Result<RecordedProgram, ShaderError> {
            if let Some((program, stage)) = self.fail {
                if program == desc.kind {
                    return Err(ShaderError {
                        program,
                        stage,
                        diagnostic: "error: expected ';', found '}'".to_string(),
                    });
                }
            }
            self.programs.push((desc.kind, desc.blend, desc.textured));
            Ok(RecordedProgram {
                kind: desc.kind,
                texture: None,
            })
        }

        fn upload_geometry(
            &mut self,
            desc: &GeometryDesc<'_>,
        ) -> Result<RecordedGeometry, ResourceError> {
            if desc.vertices.is_empty() {
                return Err(ResourceError::EmptyGeometry {
                    label: desc.label.to_string(),
                });
            }
            let geometry = RecordedGeometry {
                label: desc.label.to_string(),
                vertex_count: desc.vertices.len() / desc.layout.stride_floats,
                triangle_count: desc.primitive.triangle_count(),
                indexed: matches!(desc.primitive, Primitive::Triangles { .. }),
            };
            self.geometries.push(geometry.clone());
            Ok(geometry)
        }

        fn upload_texture(
            &mut self,
            image: &image::RgbaImage,
            _label: &str,
        ) -> Result<RecordedTexture, ResourceError> {
            let texture = RecordedTexture {
                width: image.width(),
                height: image.height(),
            };
            self.textures.push(texture);
            Ok(texture)
        }

        fn bind_texture(&mut self, program: &mut RecordedProgram, texture: &RecordedTexture) {
            program.texture = Some(*texture);
            self.bound_textures.push((program.kind, *texture));
        }

        fn set_viewport(&mut self, width: u32, height: u32) {
            self.viewport = Some((width, height));
        }

        fn render(&mut self, frame: &FrameDesc<'_, Self>) {
            let passes = frame
                .passes
                .iter()
                .map(|pass| RecordedPass {
                    clear_color: pass.clear_color,
                    clear_depth: pass.clear_depth,
                    program: pass.draw.program.kind,
                    geometry: pass.draw.geometry.label.clone(),
                    texture: pass.draw.program.texture,
                    uniforms: pass.draw.uniforms.to_vec(),
                })
                .collect();
            self.frames.push(passes);
        }
    }
}
