use wgpu;

use super::gpu::GpuContext;
use super::uniforms::{UniformBlock, UniformLayout};
use crate::params::ParameterTable;
use crate::session::ShaderCompiler;

/// A compiled shader with the uniform buffer matching its parameter layout.
pub struct ShaderProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: wgpu::BindGroup,
    pub uniform_buffer: wgpu::Buffer,
    pub uniforms: UniformBlock,
}

impl ShaderProgram {
    /// Copies the CPU-side uniform block to the GPU.
    pub fn upload(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.uniform_buffer, 0, self.uniforms.as_bytes());
    }
}

/// Compiles WGSL fragment shaders against the generated parameter prelude.
pub struct WgpuCompiler<'a> {
    gpu: &'a GpuContext,
    texture_format: wgpu::TextureFormat,
}

impl<'a> WgpuCompiler<'a> {
    pub fn new(gpu: &'a GpuContext, texture_format: wgpu::TextureFormat) -> Self {
        Self { gpu, texture_format }
    }

    fn build(&self, source: &str, layout: UniformLayout) -> ShaderProgram {
        let device = &self.gpu.device;
        let shader_source = format!("{}{}", layout.prelude(), source);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("live_shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("params_bind_group_layout"),
            entries: &[
                // @binding(0): ShaderParams
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("live_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("live_render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.texture_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("params_uniform_buffer"),
            size: layout.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("params_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        ShaderProgram {
            pipeline,
            bind_group,
            uniform_buffer,
            uniforms: UniformBlock::new(layout),
        }
    }
}

impl ShaderCompiler for WgpuCompiler<'_> {
    type Shader = ShaderProgram;

    fn compile(&mut self, source: &str, params: &ParameterTable) -> Result<ShaderProgram, String> {
        let layout = UniformLayout::for_table(params);
        let prelude_lines = layout.prelude_lines();

        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let program = self.build(source, layout);
        match pollster::block_on(device.pop_error_scope()) {
            None => Ok(program),
            Some(error) => Err(format!(
                "{} (line numbers include {} generated prelude lines)",
                error, prelude_lines
            )),
        }
    }
}
