//! Error taxonomy for viewer initialization.
//!
//! Every error here is fatal: the viewer either finishes setup completely or never
//! reaches a rendering state. Diagnostic text coming from a subsystem (the WGSL
//! compiler, the image decoder, a model parser) is carried verbatim.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::ProgramKind;

/// Failure to turn a model file into a [`Mesh`](crate::Mesh).
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read model '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported model format '{0}'")]
    UnsupportedFormat(String),
    #[error("cannot parse model '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("model '{}' contains no meshes", path.display())]
    NoMeshes { path: PathBuf },
    #[error("model '{}' contains no triangle faces", path.display())]
    NoFaces { path: PathBuf },
    #[error("face index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Which step of building a shader program failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// Vertex and fragment stages compiled, but could not be combined into a pipeline.
    Link,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
            ShaderStage::Link => write!(f, "link"),
        }
    }
}

/// A shader program failed to compile or link.
#[derive(Debug, Error)]
#[error("{program} program failed at {stage} stage:\n{diagnostic}")]
pub struct ShaderError {
    pub program: ProgramKind,
    pub stage: ShaderStage,
    /// Compiler output, unmodified.
    pub diagnostic: String,
}

/// A GPU resource could not be created.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to allocate {label}: {message}")]
    Allocation { label: String, message: String },
    #[error("{label} has no vertices to upload")]
    EmptyGeometry { label: String },
    #[error("mesh has no per-vertex normals; the lit pass cannot shade it")]
    MissingNormals,
    #[error("cannot load background image '{}': {source}", path.display())]
    TextureLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot read shader source '{}': {source}", path.display())]
    ShaderSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that stops the viewer from reaching its first frame.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("GPU initialization failed: {0}")]
    Gpu(String),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),
}
