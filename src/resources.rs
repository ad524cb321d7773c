//! GPU resources for the two passes, built once before the first frame.

use std::path::Path;

use image::RgbaImage;

use crate::backend::{
    Blend, GeometryDesc, Primitive, ProgramDesc, ProgramKind, RenderBackend, VertexLayout,
};
use crate::error::{InitError, ResourceError};
use crate::mesh::Mesh;
use crate::renderer::{BackgroundUniforms, ObjectUniforms};
use crate::shaders::ShaderLibrary;

/// The unit quad the background is drawn on, as a 4-vertex triangle fan.
pub struct BackgroundQuad;

impl BackgroundQuad {
    pub const VERTEX_COUNT: u32 = 4;

    const CORNERS: [[f32; 3]; 4] = [
        [1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
    ];

    /// Interleaved position + texcoord records in [`VertexLayout::BACKGROUND`].
    pub fn vertices() -> [f32; 20] {
        let mut out = [0.0; 20];
        for (i, corner) in Self::CORNERS.iter().enumerate() {
            let u = if i == 0 || i == 3 { 1.0 } else { 0.0 };
            let v = if i == 0 || i == 1 { 1.0 } else { 0.0 };
            out[i * 5..i * 5 + 3].copy_from_slice(corner);
            out[i * 5 + 3] = u;
            out[i * 5 + 4] = v;
        }
        out
    }
}

/// RGBA pixels for the background texture.
#[derive(Clone, Debug)]
pub struct BackgroundImage {
    pub pixels: RgbaImage,
}

impl BackgroundImage {
    /// Loads an image file, mirrored vertically so its first row ends up at the top
    /// of the quad.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| ResourceError::TextureLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let pixels = img.flipv().to_rgba8();
        log::info!(
            "Loaded background {} ({}x{})",
            path.display(),
            pixels.width(),
            pixels.height()
        );
        Ok(Self { pixels })
    }

    /// Two-tone grey checkerboard of `size`x`size` pixels in 8x8 cells.
    pub fn checkerboard(size: u32) -> Self {
        let size = size.max(8);
        let cell = size / 8;
        let pixels = RgbaImage::from_fn(size, size, |x, y| {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let shade = if light { 170 } else { 85 };
            image::Rgba([shade, shade, shade, 255])
        });
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Programs, geometry and texture for both passes.
///
/// Everything is owned here and released on drop, so this must be dropped
/// before the backend's device.
pub struct GpuResourceSet<B: RenderBackend> {
    pub background_program: B::Program,
    pub background_quad: B::Geometry,
    pub background_texture: B::Texture,
    pub object_program: B::Program,
    pub object_geometry: B::Geometry,
    pub object_triangles: u32,
}

impl<B: RenderBackend> GpuResourceSet<B> {
    /// Compiles both programs and uploads all data. Any failure aborts the whole set.
    pub fn new(
        backend: &mut B,
        shaders: &ShaderLibrary,
        mesh: &Mesh,
        background: &BackgroundImage,
    ) -> Result<Self, InitError> {
        let mut background_program = backend.compile_program(&ProgramDesc {
            kind: ProgramKind::Background,
            vertex_source: &shaders.background.vertex,
            fragment_source: &shaders.background.fragment,
            layout: VertexLayout::BACKGROUND,
            uniform_size: std::mem::size_of::<BackgroundUniforms>() as u64,
            textured: true,
            blend: Blend::Replace,
        })?;
        log::info!("Compiled {} program", ProgramKind::Background);

        let quad = BackgroundQuad::vertices();
        let background_quad = backend.upload_geometry(&GeometryDesc {
            label: "Background Quad",
            layout: VertexLayout::BACKGROUND,
            vertices: &quad,
            primitive: Primitive::TriangleFan {
                vertex_count: BackgroundQuad::VERTEX_COUNT,
            },
        })?;

        let background_texture = backend.upload_texture(&background.pixels, "Background Texture")?;
        backend.bind_texture(&mut background_program, &background_texture);

        let object_program = backend.compile_program(&ProgramDesc {
            kind: ProgramKind::Object,
            vertex_source: &shaders.object.vertex,
            fragment_source: &shaders.object.fragment,
            layout: VertexLayout::OBJECT,
            uniform_size: std::mem::size_of::<ObjectUniforms>() as u64,
            textured: false,
            blend: Blend::AlphaOver,
        })?;
        log::info!("Compiled {} program", ProgramKind::Object);

        let interleaved = mesh
            .interleaved_position_normal()
            .ok_or(ResourceError::MissingNormals)?;
        let primitive = Primitive::Triangles {
            indices: &mesh.indices,
        };
        let object_triangles = primitive.triangle_count();
        let object_geometry = backend.upload_geometry(&GeometryDesc {
            label: "Object Mesh",
            layout: VertexLayout::OBJECT,
            vertices: &interleaved,
            primitive,
        })?;

        log::debug!(
            "GPU resources ready: {} object triangles, {}x{} background",
            object_triangles,
            background.width(),
            background.height()
        );

        Ok(Self {
            background_program,
            background_quad,
            background_texture,
            object_program,
            object_geometry,
            object_triangles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;
    use crate::error::{ShaderError, ShaderStage};

    fn triangle() -> Mesh {
        Mesh {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn quad_corners_and_texcoords() {
        let v = BackgroundQuad::vertices();
        let records: Vec<&[f32]> = v.chunks_exact(5).collect();
        assert_eq!(records[0], &[1.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(records[1], &[0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(records[2], &[0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(records[3], &[1.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn checkerboard_alternates() {
        let img = BackgroundImage::checkerboard(64);
        assert_eq!((img.width(), img.height()), (64, 64));
        assert_ne!(img.pixels.get_pixel(0, 0), img.pixels.get_pixel(8, 0));
        assert_eq!(img.pixels.get_pixel(0, 0), img.pixels.get_pixel(8, 8));
    }

    #[test]
    fn missing_background_file_is_texture_error() {
        let err = BackgroundImage::load("/nonexistent/background.png").unwrap_err();
        assert!(matches!(err, ResourceError::TextureLoad { .. }));
    }

    #[test]
    fn builds_both_passes() {
        let mut backend = RecordingBackend::default();
        let set = GpuResourceSet::new(
            &mut backend,
            &ShaderLibrary::builtin(),
            &triangle(),
            &BackgroundImage::checkerboard(16),
        )
        .unwrap();

        assert_eq!(
            backend.programs,
            vec![
                (ProgramKind::Background, Blend::Replace, true),
                (ProgramKind::Object, Blend::AlphaOver, false),
            ]
        );
        assert_eq!(backend.geometries.len(), 2);
        assert_eq!(backend.geometries[0].vertex_count, 4);
        assert_eq!(backend.geometries[0].triangle_count, 2);
        assert!(!backend.geometries[0].indexed);
        assert_eq!(backend.geometries[1].vertex_count, 3);
        assert!(backend.geometries[1].indexed);
        assert_eq!(backend.textures[0].width, 16);
        assert_eq!(set.background_program.texture, Some(backend.textures[0]));
        assert!(set.object_program.texture.is_none());
        assert_eq!(set.object_triangles, 1);
    }

    #[test]
    fn shader_failure_names_program_and_stage() {
        let mut backend = RecordingBackend {
            fail: Some((ProgramKind::Object, ShaderStage::Fragment)),
            ..Default::default()
        };
        let result = GpuResourceSet::new(
            &mut backend,
            &ShaderLibrary::builtin(),
            &triangle(),
            &BackgroundImage::checkerboard(16),
        );

        match result {
            Err(InitError::Shader(ShaderError {
                program, stage, diagnostic,
            })) => {
                assert_eq!(program, ProgramKind::Object);
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(diagnostic, "error: expected ';', found '}'");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a shader error"),
        }
        // Nothing for the object pass was uploaded
        assert_eq!(backend.geometries.len(), 1);
    }

    #[test]
    fn mesh_without_normals_is_rejected() {
        let mut mesh = triangle();
        mesh.normals.clear();
        let mut backend = RecordingBackend::default();
        let result = GpuResourceSet::new(
            &mut backend,
            &ShaderLibrary::builtin(),
            &mesh,
            &BackgroundImage::checkerboard(16),
        );
        assert!(matches!(
            result,
            Err(InitError::Resource(ResourceError::MissingNormals))
        ));
    }
}
