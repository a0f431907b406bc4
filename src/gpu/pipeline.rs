//! Render pipelines, one per program and blend setup.

use crate::scene::{Blending, ShaderProgram};
use crate::shader::Program;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Everything that changes pipeline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub program: Program,
    pub blending: Blending,
    pub depth_write: bool,
}

impl PipelineKey {
    /// Drawn after opaque geometry.
    pub fn is_blended(&self) -> bool {
        self.blending == Blending::Additive || !self.depth_write
    }
}

/// Float components per attribute, in buffer order.
fn component_counts(program: Program) -> &'static [u32] {
    match program {
        Program::Mesh => &[3, 3],
        Program::Points(ShaderProgram::EnergyField) => &[3, 1, 1],
        Program::Points(ShaderProgram::AmbientParticles) => &[3, 1],
    }
}

/// Floats per vertex (meshes) or per point instance.
pub(crate) fn stride_floats(program: Program) -> u32 {
    component_counts(program).iter().sum()
}

/// Meshes step per vertex. Points step per instance and expand to quads.
pub(crate) fn step_mode(program: Program) -> wgpu::VertexStepMode {
    match program {
        Program::Mesh => wgpu::VertexStepMode::Vertex,
        Program::Points(_) => wgpu::VertexStepMode::Instance,
    }
}

fn vertex_attributes(program: Program) -> Vec<wgpu::VertexAttribute> {
    let mut offset = 0;
    component_counts(program)
        .iter()
        .enumerate()
        .map(|(location, &n)| {
            let format = match n {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                _ => wgpu::VertexFormat::Float32x4,
            };
            let attribute = wgpu::VertexAttribute {
                offset,
                shader_location: location as u32,
                format,
            };
            offset += n as wgpu::BufferAddress * 4;
            attribute
        })
        .collect()
}

fn blend_state(blending: Blending) -> wgpu::BlendState {
    match blending {
        Blending::Normal => wgpu::BlendState::ALPHA_BLENDING,
        Blending::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    }
}

pub(crate) fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let label = key.program.label();
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(key.program.source().into()),
    });

    let attributes = vertex_attributes(key.program);
    let buffers = [wgpu::VertexBufferLayout {
        array_stride: stride_floats(key.program) as wgpu::BufferAddress * 4,
        step_mode: step_mode(key.program),
        attributes: &attributes,
    }];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend_state(key.blending)),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: key.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

pub(crate) fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
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
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
