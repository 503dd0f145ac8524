//! WebGPU render backend.
//!
//! One pipeline, one uniform buffer and at most one mesh. The surface,
//! device and queue are created by the host ahead of `start` (window
//! creation and adapter requests belong to the host thread) and handed over
//! as a [`PreparedSurface`].

use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use wgpu::{Device, Queue, RenderPipeline, Surface, SurfaceConfiguration};

use super::backend::{FrameUniforms, RenderBackend, SurfaceFactory, SurfaceRequest};
use super::meshing::Mesh;
use super::texture::DepthTexture;
use super::Vertex;
use crate::core::errors::WorkerError;

/// WGSL source of the voxel pipeline.
pub const VOXEL_SHADER: &str = include_str!("../../../assets/shaders/voxel_shader.wgsl");

/// A configured surface with the device and queue that drive it.
pub struct PreparedSurface {
    /// Presentation surface
    pub surface: Surface<'static>,
    /// Device owning every GPU resource
    pub device: Device,
    /// Submission queue
    pub queue: Queue,
    /// Current surface configuration
    pub config: SurfaceConfiguration,
}

/// Vertex and index buffers of the live mesh.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Voxel Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Voxel Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// Draws the voxel mesh to a wgpu surface.
pub struct WgpuBackend {
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    pipeline: RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    depth: Option<DepthTexture>,
    mesh: Option<GpuMesh>,
    clear_color: wgpu::Color,
    released: bool,
}

impl WgpuBackend {
    /// Builds the pipeline on a prepared surface.
    ///
    /// # Arguments
    /// * `prepared` - Surface, device and queue from the host
    /// * `width` - Initial width in physical pixels
    /// * `height` - Initial height in physical pixels
    /// * `clear_color` - RGBA clear color
    pub fn new(prepared: PreparedSurface, width: u32, height: u32, clear_color: [f32; 4]) -> Self {
        let PreparedSurface {
            surface,
            device,
            queue,
            mut config,
        } = prepared;
        config.width = width.max(1);
        config.height = height.max(1);
        surface.configure(&device, &config);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Frame Bind Group Layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("Frame Bind Group"),
        });

        let pipeline = create_pipeline(&device, &bind_group_layout, config.format);
        let depth = DepthTexture::new(&device, &config, "Voxel Depth Texture");

        info!("wgpu backend ready at {}x{} ({:?})", config.width, config.height, config.format);
        Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            uniform_buffer,
            bind_group,
            depth: Some(depth),
            mesh: None,
            clear_color: wgpu::Color {
                r: clear_color[0] as f64,
                g: clear_color[1] as f64,
                b: clear_color[2] as f64,
                a: clear_color[3] as f64,
            },
            released: false,
        }
    }

    fn ensure_live(&self) -> Result<(), WorkerError> {
        if self.released {
            Err(WorkerError::Resource("render surface has been released".into()))
        } else {
            Ok(())
        }
    }
}

fn create_pipeline(
    device: &Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Voxel Render Pipeline Layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Voxel Shader"),
        source: wgpu::ShaderSource::Wgsl(VOXEL_SHADER.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Voxel Render Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::desc()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthTexture::depth_stencil_state()),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

impl RenderBackend for WgpuBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if self.released {
            return;
        }
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth = Some(DepthTexture::new(&self.device, &self.config, "Voxel Depth Texture"));
    }

    fn upload_mesh(&mut self, mesh: &Mesh) -> Result<(), WorkerError> {
        self.ensure_live()?;
        let uploaded = (!mesh.is_empty()).then(|| GpuMesh::upload(&self.device, mesh));
        // Dropping the previous GpuMesh destroys its buffers.
        self.mesh = uploaded;
        debug!("Uploaded mesh with {} indices", mesh.indices.len());
        Ok(())
    }

    fn render(&mut self, uniforms: &FrameUniforms) -> Result<(), WorkerError> {
        self.ensure_live()?;
        let Some(depth) = self.depth.as_ref() else {
            return Err(WorkerError::Resource("depth buffer missing".into()));
        };

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("Timed out acquiring frame, skipping");
                return Ok(());
            }
            Err(err) => {
                return Err(WorkerError::Resource(format!("Error getting current frame: {err}")));
            }
        };

        let view = frame.texture.create_view(&Default::default());
        let mut encoder = self.device.create_command_encoder(&Default::default());
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Voxel Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(mesh) = &self.mesh {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.bind_group, &[]);
                rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit([encoder.finish()]);
        frame.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.mesh = None;
        self.depth = None;
        self.uniform_buffer.destroy();
        self.released = true;
        info!("wgpu backend released");
    }
}

/// Hands a single prepared surface to the first `start`.
pub struct WgpuSurfaceFactory {
    prepared: Option<PreparedSurface>,
}

impl WgpuSurfaceFactory {
    /// Wraps a surface prepared by the host.
    pub fn new(prepared: PreparedSurface) -> Self {
        Self {
            prepared: Some(prepared),
        }
    }
}

impl SurfaceFactory for WgpuSurfaceFactory {
    fn create(&mut self, request: &SurfaceRequest) -> Result<Box<dyn RenderBackend>, WorkerError> {
        let prepared = self.prepared.take().ok_or_else(|| {
            WorkerError::Resource("the render surface was already used by an earlier start".into())
        })?;
        Ok(Box::new(WgpuBackend::new(
            prepared,
            request.width,
            request.height,
            request.clear_color,
        )))
    }
}
