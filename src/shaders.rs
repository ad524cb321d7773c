//! Shader sources, kept as data and compiled once at initialization.
//!
//! The built-in WGSL is embedded in the binary. A directory containing files with
//! the same names can replace it at startup, which is handy when iterating on the
//! look of either pass without rebuilding.

use std::fs;
use std::path::Path;

use crate::error::ResourceError;

/// Vertex and fragment source of one program.
#[derive(Clone, Debug)]
pub struct ProgramSource {
    pub vertex: String,
    pub fragment: String,
}

/// Sources for both programs.
#[derive(Clone, Debug)]
pub struct ShaderLibrary {
    pub background: ProgramSource,
    pub object: ProgramSource,
}

impl ShaderLibrary {
    pub const BACKGROUND_VERTEX_FILE: &'static str = "background.vert.wgsl";
    pub const BACKGROUND_FRAGMENT_FILE: &'static str = "background.frag.wgsl";
    pub const OBJECT_VERTEX_FILE: &'static str = "object.vert.wgsl";
    pub const OBJECT_FRAGMENT_FILE: &'static str = "object.frag.wgsl";

    /// The sources compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            background: ProgramSource {
                vertex: include_str!("shaders/background.vert.wgsl").to_string(),
                fragment: include_str!("shaders/background.frag.wgsl").to_string(),
            },
            object: ProgramSource {
                vertex: include_str!("shaders/object.vert.wgsl").to_string(),
                fragment: include_str!("shaders/object.frag.wgsl").to_string(),
            },
        }
    }

    /// Reads all four sources from `dir`. Every file must be present.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| ResourceError::ShaderSource { path, source })
        };

        log::info!("Loading shader sources from {}", dir.display());

        Ok(Self {
            background: ProgramSource {
                vertex: read(Self::BACKGROUND_VERTEX_FILE)?,
                fragment: read(Self::BACKGROUND_FRAGMENT_FILE)?,
            },
            object: ProgramSource {
                vertex: read(Self::OBJECT_VERTEX_FILE)?,
                fragment: read(Self::OBJECT_FRAGMENT_FILE)?,
            },
        })
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sources_have_entry_points() {
        let lib = ShaderLibrary::builtin();
        for source in [&lib.background.vertex, &lib.object.vertex] {
            assert!(source.contains("fn vs_main"));
        }
        for source in [&lib.background.fragment, &lib.object.fragment] {
            assert!(source.contains("fn fs_main"));
        }
    }

    #[test]
    fn object_shader_reads_object_attribute_slots() {
        let lib = ShaderLibrary::builtin();
        assert!(lib.object.vertex.contains("@location(2) position"));
        assert!(lib.object.vertex.contains("@location(3) normal"));
        assert!(lib.background.vertex.contains("@location(0) position"));
        assert!(lib.background.vertex.contains("@location(1) tex_coord"));
    }

    #[test]
    fn missing_directory_reports_path() {
        let err = ShaderLibrary::from_dir("/nonexistent/shader/dir").unwrap_err();
        match err {
            ResourceError::ShaderSource { path, .. } => {
                assert!(path.ends_with(ShaderLibrary::BACKGROUND_VERTEX_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
