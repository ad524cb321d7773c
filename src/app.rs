use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::{MIN_WINDOW_SIZE, ViewerConfig};
use crate::error::InitError;
use crate::gpu::GpuContext;
use crate::import::import_mesh;
use crate::input::InputController;
use crate::renderer::FrameRenderer;
use crate::resources::{BackgroundImage, GpuResourceSet};
use crate::shaders::ShaderLibrary;
use crate::view::ViewState;

/// Side length of the generated background when no image is given.
const CHECKERBOARD_SIZE: u32 = 256;

/// Opens the viewer window and runs until it is closed.
///
/// Initialization happens once the event loop is live. If any step fails the loop
/// exits before a frame is drawn and the error is returned here.
///
/// # Example
/// ```no_run
/// use bgview::{ViewerConfig, run};
///
/// run(ViewerConfig::new("model.obj").background("photo.jpg").fit(true))?;
/// # Ok::<(), bgview::InitError>(())
/// ```
pub fn run(config: ViewerConfig) -> Result<(), InitError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = ViewerApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        ViewerApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

/// Everything that lives while the window is open.
///
/// Fields drop in declaration order: GPU resources go before the context
/// that created them, and the window goes last.
struct Viewer {
    resources: GpuResourceSet<GpuContext>,
    renderer: FrameRenderer,
    view: ViewState,
    input: InputController,
    gpu: GpuContext,
    window: Arc<Window>,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, config: &ViewerConfig) -> Result<Self, InitError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .with_min_inner_size(winit::dpi::LogicalSize::new(
                MIN_WINDOW_SIZE,
                MIN_WINDOW_SIZE,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let mut gpu = GpuContext::new(window.clone())?;

        let mut mesh = import_mesh(&config.model, config.import_flags)?;
        if config.center {
            mesh.recenter();
        }
        if config.fit {
            mesh.fit_unit_cube();
        }

        let background = match &config.background {
            Some(path) => BackgroundImage::load(path)?,
            None => {
                log::info!("No background image given, using a checkerboard");
                BackgroundImage::checkerboard(CHECKERBOARD_SIZE)
            }
        };

        let shaders = match &config.shader_dir {
            Some(dir) => ShaderLibrary::from_dir(dir)?,
            None => ShaderLibrary::builtin(),
        };

        let resources = GpuResourceSet::new(&mut gpu, &shaders, &mesh, &background)?;

        let (width, height) = (gpu.width(), gpu.height());
        let mut renderer = FrameRenderer::new(width, height).with_object_color(config.mesh_color);
        renderer.resize(&mut gpu, width, height);

        let mut view = ViewState::new().with_clear_color(config.clear_color);
        view.mark_dirty();

        let mut input = InputController::new();
        let mut clicks = 0u64;
        input.on_clicked(move || {
            clicks += 1;
            log::info!("Clicked ({clicks})");
        });

        let (width, height) = renderer.size();
        log::info!("Viewer ready at {}x{}", width, height);

        Ok(Self {
            resources,
            renderer,
            view,
            input,
            gpu,
            window,
        })
    }

    fn handle_event(&mut self, event_loop: &ActiveEventLoop, event: WindowEvent) {
        self.input.handle_event(&event, &mut self.view);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.renderer
                    .resize(&mut self.gpu, size.width, size.height);
                self.view.mark_dirty();
            }
            WindowEvent::RedrawRequested => {
                self.renderer
                    .render(&mut self.gpu, &self.resources, &self.view);
            }
            _ => {}
        }

        if self.view.take_dirty() {
            self.window.request_redraw();
        }
    }
}

enum ViewerApp {
    Pending { config: ViewerConfig },
    Running(Box<Viewer>),
    Failed(InitError),
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ViewerApp::Pending { config } = self else {
            return;
        };

        *self = match Viewer::new(event_loop, config) {
            Ok(viewer) => ViewerApp::Running(Box::new(viewer)),
            Err(err) => {
                event_loop.exit();
                ViewerApp::Failed(err)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let ViewerApp::Running(viewer) = self {
            viewer.handle_event(event_loop, event);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let ViewerApp::Running(_) = self {
            log::info!("Shutting down");
        }
    }
}
