use std::borrow::Cow;

use wgpu::naga::ShaderStage as NagaStage;

use crate::compile::{ProgramId, ShaderProgram, StageSource};
use crate::error::SketchError;
use crate::gpu::uniforms::UniformBlock;

use super::context::{DEPTH_COMPARE, DEPTH_FORMAT};
use super::quad::QuadVertex;

/// Render pipeline and uniform storage for one bound [`ShaderProgram`].
pub(crate) struct ShaderPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub uniform_bind_group: wgpu::BindGroup,
    pub uniforms: UniformBlock,
    program: ProgramId,
}

impl ShaderPipeline {
    /// Builds the pipeline for `program`. Depth testing is enabled when
    /// `depth` is set; the canvas passes it for WebGL-mode surfaces.
    pub fn new(
        device: &wgpu::Device,
        program: &ShaderProgram,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
        depth: bool,
    ) -> Result<Self, SketchError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniforms = UniformBlock::new(program.uniform_layout().clone());
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sketch uniforms"),
            size: uniforms.bytes().len() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sketch uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sketch uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let vertex_module = create_module(device, program.vertex(), NagaStage::Vertex);
        let fragment_module = create_module(device, program.fragment(), NagaStage::Fragment);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sketch pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let depth_stencil = depth.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: DEPTH_COMPARE,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sketch pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(SketchError::Pipeline(error.to_string()));
        }

        tracing::debug!(
            program = ?program.id(),
            uniform_bytes = uniforms.bytes().len(),
            sample_count,
            depth,
            "render pipeline ready"
        );

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            program: program.id(),
        })
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn upload_uniforms(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.uniform_buffer, 0, self.uniforms.bytes());
    }
}

fn create_module(device: &wgpu::Device, source: &StageSource, stage: NagaStage) -> wgpu::ShaderModule {
    let label = source.path.display().to_string();
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(&source.glsl),
            stage,
            defines: &[],
        },
    })
}
