//! wgpu renderer.
//!
//! Draws the scene graph each frame: lit meshes first, then blended point
//! clouds expanded to camera-facing quads. GPU buffers are created per node
//! and rebuilt when the node's geometry id changes, so a field reset shows
//! up on the next frame.

mod pipeline;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Mat4;
use log::{debug, info, trace};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::Camera;
use crate::error::{GpuError, RenderError};
use crate::renderer::Renderer;
use crate::scene::{Blending, Dispose, Geometry, GeometryId, Material, NodeId, NodeKind, Scene};
use crate::shader::{mesh_uniforms, FrameUniforms, ObjectUniforms, Program};

use pipeline::{create_depth_texture, create_pipeline, stride_floats, PipelineKey};

/// GPU copies of one renderable node.
struct DrawResources {
    geometry: GeometryId,
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<(wgpu::Buffer, u32)>,
    /// Vertices for meshes, point instances for point clouds.
    count: u32,
    object_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
    material_size: usize,
    bind_group: wgpu::BindGroup,
}

impl DrawResources {
    fn destroy(&self) {
        self.vertex_buffer.destroy();
        if let Some((buffer, _)) = &self.index_buffer {
            buffer.destroy();
        }
        self.object_buffer.destroy();
        self.material_buffer.destroy();
    }
}

pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    draws: HashMap<NodeId, DrawResources>,
    pixel_ratio: f32,
    disposed: bool,
}

impl GpuRenderer {
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        // Object transform plus the material table
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                uniform_entry(1, wgpu::ShaderStages::VERTEX_FRAGMENT),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            frame_buffer,
            frame_bind_group,
            object_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            draws: HashMap::new(),
            pixel_ratio: 1.0,
            disposed: false,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Upload a renderable's buffers, creating them on first sight and
    /// rebuilding them when its geometry was replaced.
    fn prepare(
        &mut self,
        id: NodeId,
        program: Program,
        geometry: &Geometry,
        material_bytes: &[u8],
        world: Mat4,
    ) -> bool {
        let stale = self
            .draws
            .get(&id)
            .map_or(true, |d| d.geometry != geometry.id() || d.material_size != material_bytes.len());
        if stale {
            let Some(vertices) = geometry.interleave(program.attributes()) else {
                debug!("Node {:?} lacks attributes for {}, skipped", id, program.label());
                return false;
            };
            let count = vertices.len() as u32 / stride_floats(program);
            let resources = self.create_draw(geometry.id(), &vertices, geometry.indices(), count, material_bytes);
            if let Some(old) = self.draws.insert(id, resources) {
                old.destroy();
            }
        }

        if let Some(draw) = self.draws.get(&id) {
            let object = ObjectUniforms::from(world);
            self.queue
                .write_buffer(&draw.object_buffer, 0, bytemuck::bytes_of(&object));
            self.queue.write_buffer(&draw.material_buffer, 0, material_bytes);
        }
        true
    }

    fn create_draw(
        &self,
        geometry: GeometryId,
        vertices: &[f32],
        indices: Option<&[u32]>,
        count: u32,
        material_bytes: &[u8],
    ) -> DrawResources {
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = indices.map(|indices| {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });
        let object_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniforms"),
            size: std::mem::size_of::<ObjectUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let material_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Uniforms"),
            contents: material_bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &self.object_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: object_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: material_buffer.as_entire_binding(),
                },
            ],
        });

        DrawResources {
            geometry,
            vertex_buffer,
            index_buffer,
            count,
            object_buffer,
            material_buffer,
            material_size: material_bytes.len(),
            bind_group,
        }
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if !self.pipelines.contains_key(&key) {
            debug!("Creating pipeline {:?}", key);
            let pipeline = create_pipeline(&self.device, &self.pipeline_layout, self.config.format, key);
            self.pipelines.insert(key, pipeline);
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl Renderer for GpuRenderer {
    fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        if self.disposed {
            return;
        }
        self.pixel_ratio = pixel_ratio;
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        if self.disposed {
            return Ok(());
        }

        let frame = FrameUniforms::new(
            camera.view_matrix(),
            camera.projection_matrix(),
            self.config.width,
            self.config.height,
        );
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let lights = scene.lights();
        let mut batch: Vec<(PipelineKey, NodeId)> = Vec::new();
        for renderable in scene.renderables() {
            let node = scene.node(renderable.node);
            let (geometry, material) = match &node.kind {
                NodeKind::Mesh { geometry, material } | NodeKind::Points { geometry, material } => {
                    (geometry, scene.material(*material))
                }
                _ => continue,
            };
            let (key, bytes) = match (&node.kind, material) {
                (NodeKind::Mesh { .. }, Material::Standard(standard)) => (
                    PipelineKey {
                        program: Program::Mesh,
                        blending: Blending::Normal,
                        depth_write: true,
                    },
                    mesh_uniforms(standard, &lights).to_bytes(),
                ),
                (NodeKind::Points { .. }, Material::Shader(shader)) => (
                    PipelineKey {
                        program: Program::Points(shader.program),
                        blending: shader.blending,
                        depth_write: shader.depth_write,
                    },
                    shader.uniforms.to_bytes(),
                ),
                _ => {
                    trace!("Node '{}' has no matching program, skipped", node.name);
                    continue;
                }
            };
            if self.prepare(renderable.node, key.program, geometry, &bytes, renderable.world) {
                self.ensure_pipeline(key);
                batch.push((key, renderable.node));
            }
        }

        // Forget nodes that left the scene
        let live: HashSet<NodeId> = batch.iter().map(|(_, id)| *id).collect();
        self.draws.retain(|id, draw| {
            let keep = live.contains(id);
            if !keep {
                draw.destroy();
            }
            keep
        });

        // Opaque first, blended after
        batch.sort_by_key(|(key, _)| key.is_blended());

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.surface.configure(&self.device, &self.config);
                return Err(RenderError::Surface(e.to_string()));
            }
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.01,
                            g: 0.01,
                            b: 0.015,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (key, id) in &batch {
                let (Some(pipeline), Some(draw)) = (self.pipelines.get(key), self.draws.get(id)) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(1, &draw.bind_group, &[]);
                render_pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
                match (key.program, &draw.index_buffer) {
                    (Program::Mesh, Some((indices, index_count))) => {
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..*index_count, 0, 0..1);
                    }
                    (Program::Mesh, None) => render_pass.draw(0..draw.count, 0..1),
                    (Program::Points(_), _) => render_pass.draw(0..6, 0..draw.count),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl Dispose for GpuRenderer {
    fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        for (_, draw) in self.draws.drain() {
            draw.destroy();
        }
        self.pipelines.clear();
        self.frame_buffer.destroy();
        info!("GPU renderer disposed");
        true
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
