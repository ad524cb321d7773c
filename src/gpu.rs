//! wgpu device, surface and the [`RenderBackend`] built on them.
//!
//! This module provides [`GpuContext`], which owns the device, queue, surface and
//! depth buffer, and implements the viewer's rendering capability on top of them.
//!
//! # Initialization
//!
//! A `GpuContext` is created from a winit [`Window`] and handles all the wgpu boilerplate:
//! instance creation, adapter selection, device/queue creation, and surface configuration.
//! Any failure is returned as [`InitError::Gpu`] rather than panicking.
//!
//! # Diagnostics
//!
//! wgpu reports shader and pipeline problems asynchronously through error scopes.
//! Each vertex and fragment module is compiled inside its own validation scope, so
//! a failure can be attributed to one stage; pipeline creation gets a third scope
//! and is reported as the link stage.
//!
//! [`Window`]: winit::window::Window

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::backend::{
    AttributeBinding, Blend, FrameDesc, GeometryDesc, Primitive, ProgramDesc, ProgramKind,
    RenderBackend,
};
use crate::error::{InitError, ResourceError, ShaderError, ShaderStage};
use crate::texture::Texture;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Index list drawing a triangle fan of `vertex_count` vertices.
fn fan_indices(vertex_count: u32) -> Vec<u32> {
    (1..vertex_count.saturating_sub(1))
        .flat_map(|i| [0, i, i + 1])
        .collect()
}

/// Runs `f` inside an out-of-memory error scope.
pub(crate) fn capture_out_of_memory<T>(
    device: &wgpu::Device,
    label: &str,
    f: impl FnOnce() -> T,
) -> Result<T, ResourceError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(error) => Err(ResourceError::Allocation {
            label: label.to_string(),
            message: error.to_string(),
        }),
    }
}

/// Runs `f` inside a validation error scope, attributing failures to `stage`.
fn capture_validation<T>(
    device: &wgpu::Device,
    program: ProgramKind,
    stage: ShaderStage,
    f: impl FnOnce() -> T,
) -> Result<T, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(error) => Err(ShaderError {
            program,
            stage,
            diagnostic: error.to_string(),
        }),
    }
}

/// A compiled program: pipeline plus the uniform buffer its draws write into.
///
/// The bind group is built once: at compile time for untextured programs, by
/// [`RenderBackend::bind_texture`] for textured ones.
pub struct GpuProgram {
    kind: ProgramKind,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
    textured: bool,
}

/// Uploaded vertex data. Every primitive is drawn indexed; fans get generated indices.
pub struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Core GPU context holding wgpu resources.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    #[allow(dead_code)]
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// This performs all wgpu initialization:
    /// 1. Creates a wgpu instance with primary backends (Vulkan, Metal, DX12)
    /// 2. Creates a surface for the window
    /// 3. Requests a suitable GPU adapter
    /// 4. Creates the logical device and command queue
    /// 5. Configures the surface with an sRGB format and Fifo present mode
    /// 6. Allocates a depth buffer matching the surface
    pub fn new(window: Arc<Window>) -> Result<Self, InitError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| InitError::Gpu(format!("cannot create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| InitError::Gpu(format!("no suitable GPU adapter: {e}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("bgview Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| InitError::Gpu(format!("cannot create device: {e}")))?;

        let info = adapter.get_info();
        log::info!("Using {} ({:?})", info.name, info.backend);

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&fallback_format) = surface_caps.formats.first() else {
            return Err(InitError::Gpu(
                "surface is incompatible with the adapter".to_string(),
            ));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(fallback_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let (depth_texture, depth_view) = Self::create_depth_texture(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            depth_view,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Resize the surface and depth buffer to new dimensions.
    ///
    /// Ignores zero-sized dimensions to avoid wgpu validation errors
    /// (which can occur during window minimize).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            let (texture, view) = Self::create_depth_texture(&self.device, &self.config);
            self.depth_texture = texture;
            self.depth_view = view;
        }
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    fn compile_stage(
        &self,
        kind: ProgramKind,
        stage: ShaderStage,
        source: &str,
    ) -> Result<wgpu::ShaderModule, ShaderError> {
        capture_validation(&self.device, kind, stage, || {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&format!("{kind} {stage} shader")),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
        })
    }

    fn bind_group_layout(&self, desc: &ProgramDesc<'_>) -> wgpu::BindGroupLayout {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];

        if desc.textured {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }

        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} Bind Group Layout", desc.kind)),
                entries: &entries,
            })
    }

    fn bind_group(&self, program: &GpuProgram, texture: Option<&Texture>) -> wgpu::BindGroup {
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: program.uniform_buffer.as_entire_binding(),
        }];

        if let Some(texture) = texture {
            entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", program.kind)),
            layout: &program.bind_group_layout,
            entries: &entries,
        })
    }
}

fn vertex_format(attribute: AttributeBinding) -> wgpu::VertexFormat {
    match attribute.components() {
        2 => wgpu::VertexFormat::Float32x2,
        _ => wgpu::VertexFormat::Float32x3,
    }
}

impl RenderBackend for GpuContext {
    type Program = GpuProgram;
    type Geometry = GpuGeometry;
    type Texture = Texture;

    fn compile_program(&mut self, desc: &ProgramDesc<'_>) -> Result<GpuProgram, ShaderError> {
        let vertex = self.compile_stage(desc.kind, ShaderStage::Vertex, desc.vertex_source)?;
        let fragment = self.compile_stage(desc.kind, ShaderStage::Fragment, desc.fragment_source)?;

        let bind_group_layout = self.bind_group_layout(desc);

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Pipeline Layout", desc.kind)),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let attributes: Vec<wgpu::VertexAttribute> = desc
            .layout
            .attributes
            .iter()
            .map(|&a| wgpu::VertexAttribute {
                format: vertex_format(a),
                offset: (a.offset_floats() * std::mem::size_of::<f32>()) as u64,
                shader_location: a.location(),
            })
            .collect();

        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: desc.layout.stride_bytes(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let (blend, cull_mode) = match desc.blend {
            Blend::Replace => (wgpu::BlendState::REPLACE, None),
            Blend::AlphaOver => (wgpu::BlendState::ALPHA_BLENDING, Some(wgpu::Face::Back)),
        };

        let pipeline = capture_validation(&self.device, desc.kind, ShaderStage::Link, || {
            self.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&format!("{} Pipeline", desc.kind)),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &vertex,
                        entry_point: Some("vs_main"),
                        buffers: &vertex_buffers,
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &fragment,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: self.config.format,
                            blend: Some(blend),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode,
                        front_face: wgpu::FrontFace::Ccw,
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
        })?;

        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniforms", desc.kind)),
            size: desc.uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut program = GpuProgram {
            kind: desc.kind,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            bind_group: None,
            textured: desc.textured,
        };
        if !program.textured {
            program.bind_group = Some(self.bind_group(&program, None));
        }
        Ok(program)
    }

    fn upload_geometry(&mut self, desc: &GeometryDesc<'_>) -> Result<GpuGeometry, ResourceError> {
        if desc.vertices.is_empty() {
            return Err(ResourceError::EmptyGeometry {
                label: desc.label.to_string(),
            });
        }

        let indices = match desc.primitive {
            Primitive::TriangleFan { vertex_count } => fan_indices(vertex_count),
            Primitive::Triangles { indices } => indices.to_vec(),
        };

        let (vertex_buffer, index_buffer) = capture_out_of_memory(&self.device, desc.label, || {
            let vertex_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Vertices", desc.label)),
                    contents: bytemuck::cast_slice(desc.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            let index_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Indices", desc.label)),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
            (vertex_buffer, index_buffer)
        })?;

        Ok(GpuGeometry {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        })
    }

    fn upload_texture(
        &mut self,
        image: &image::RgbaImage,
        label: &str,
    ) -> Result<Texture, ResourceError> {
        Texture::from_image(self, image, label)
    }

    fn bind_texture(&mut self, program: &mut GpuProgram, texture: &Texture) {
        if !program.textured {
            log::warn!("{} program samples no texture, ignoring bind", program.kind);
            return;
        }
        let bind_group = self.bind_group(program, Some(texture));
        program.bind_group = Some(bind_group);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.resize(width, height);
    }

    fn render(&mut self, frame: &FrameDesc<'_, Self>) {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring and skipping frame");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::warn!("Skipping frame: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        for pass in &frame.passes {
            let draw = &pass.draw;
            let Some(bind_group) = &draw.program.bind_group else {
                log::warn!("{} program has no texture bound, skipping its pass", draw.program.kind);
                continue;
            };
            self.queue
                .write_buffer(&draw.program.uniform_buffer, 0, draw.uniforms);

            let color_load = match pass.clear_color {
                Some(color) => wgpu::LoadOp::Clear(color.into()),
                None => wgpu::LoadOp::Load,
            };
            let depth_load = if pass.clear_depth {
                wgpu::LoadOp::Clear(1.0)
            } else {
                wgpu::LoadOp::Load
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&format!("{} Pass", draw.program.kind)),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&draw.program.pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.set_vertex_buffer(0, draw.geometry.vertex_buffer.slice(..));
            render_pass.set_index_buffer(
                draw.geometry.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..draw.geometry.index_count, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
