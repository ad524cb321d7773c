//! Viewer configuration and its command-line front end.

use std::path::PathBuf;

use clap::Parser;

use crate::import::ImportFlags;
use crate::view::Color;

/// Smallest window the viewer allows, in logical pixels.
pub const MIN_WINDOW_SIZE: u32 = 50;

/// Configuration for the viewer window and its content.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub model: PathBuf,
    /// Background image; a generated checkerboard when `None`.
    pub background: Option<PathBuf>,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: Color,
    /// Color the mesh is lit with; its alpha sets the transparency.
    pub mesh_color: Color,
    /// Move the mesh's bounding-box centre to the origin after import.
    pub center: bool,
    /// Scale the mesh so its largest extent is 1 after import.
    pub fit: bool,
    /// Directory holding replacement WGSL sources.
    pub shader_dir: Option<PathBuf>,
    pub import_flags: ImportFlags,
}

impl ViewerConfig {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            background: None,
            title: "bgview".to_string(),
            width: 800,
            height: 600,
            clear_color: Color::BLACK,
            mesh_color: Color::MESH_GREEN,
            center: false,
            fit: false,
            shader_dir: None,
            import_flags: ImportFlags::default(),
        }
    }

    pub fn background(mut self, path: impl Into<PathBuf>) -> Self {
        self.background = Some(path.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial window size, raised to [`MIN_WINDOW_SIZE`] where smaller.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(MIN_WINDOW_SIZE);
        self.height = height.max(MIN_WINDOW_SIZE);
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn mesh_color(mut self, color: Color) -> Self {
        self.mesh_color = color;
        self
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn fit(mut self, fit: bool) -> Self {
        self.fit = fit;
        self
    }

    pub fn shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    pub fn import_flags(mut self, flags: ImportFlags) -> Self {
        self.import_flags = flags;
        self
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "bgview",
    version,
    about = "Show a 3D model in front of a background image",
    long_about = "Show a 3D model in front of a background image.\n\n\
        Drag with the left mouse button to rotate about X and Y,\n\
        with the right mouse button to rotate about X and Z."
)]
pub struct Args {
    /// Model file (.obj, .stl, .gltf or .glb)
    pub model: PathBuf,

    /// Background image; a checkerboard is shown when omitted
    #[arg(short, long)]
    pub background: Option<PathBuf>,

    /// Window title
    #[arg(long, default_value = "bgview")]
    pub title: String,

    /// Initial window width
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Initial window height
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Clear color as r,g,b or r,g,b,a with components in [0, 1]
    #[arg(long, value_name = "RGBA")]
    pub clear_color: Option<Color>,

    /// Mesh color as r,g,b or r,g,b,a; alpha below 1 makes it see-through
    #[arg(long, value_name = "RGBA")]
    pub mesh_color: Option<Color>,

    /// Move the model's centre to the origin
    #[arg(long)]
    pub center: bool,

    /// Scale the model to fit a unit cube
    #[arg(long)]
    pub fit: bool,

    /// Load WGSL sources from this directory instead of the built-in ones
    #[arg(long, value_name = "DIR")]
    pub shader_dir: Option<PathBuf>,
}

impl From<Args> for ViewerConfig {
    fn from(args: Args) -> Self {
        if args.width < MIN_WINDOW_SIZE || args.height < MIN_WINDOW_SIZE {
            log::warn!(
                "Window size {}x{} is below the {}x{} minimum, enlarging",
                args.width,
                args.height,
                MIN_WINDOW_SIZE,
                MIN_WINDOW_SIZE
            );
        }

        let mut config = ViewerConfig::new(args.model)
            .title(args.title)
            .size(args.width, args.height)
            .center(args.center)
            .fit(args.fit);

        if let Some(background) = args.background {
            config = config.background(background);
        }
        if let Some(color) = args.clear_color {
            config = config.clear_color(color);
        }
        if let Some(color) = args.mesh_color {
            config = config.mesh_color(color);
        }
        if let Some(dir) = args.shader_dir {
            config = config.shader_dir(dir);
        }
        config
    }
}
