use anyhow::{Context, Result};
use wgpu;

use super::gpu::GpuContext;
use super::pipeline::ShaderProgram;

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Offscreen render target with a readback buffer for recording.
pub struct FrameRenderer {
    pub render_texture: wgpu::Texture,
    pub render_texture_view: wgpu::TextureView,
    pub output_buffer: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
    pub padded_bytes_per_row: u32,
    pub unpadded_bytes_per_row: u32,
    pub clear_color: wgpu::Color,
}

impl FrameRenderer {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let render_texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("render_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let render_texture_view = render_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let output_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output_buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            render_texture,
            render_texture_view,
            output_buffer,
            width,
            height,
            padded_bytes_per_row,
            unpadded_bytes_per_row,
            clear_color: wgpu::Color {
                r: 0.5,
                g: 0.5,
                b: 0.5,
                a: 0.0,
            },
        }
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, program: &ShaderProgram) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.render_texture_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&program.pipeline);
        render_pass.set_bind_group(0, &program.bind_group, &[]);
        render_pass.draw(0..3, 0..1); // fullscreen triangle
    }

    /// Draws one frame without reading it back.
    pub fn render(&self, gpu: &GpuContext, program: &ShaderProgram) {
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        self.encode_pass(&mut encoder, program);
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draws one frame and returns its tightly packed RGBA pixels.
    pub fn render_and_readback(&self, gpu: &GpuContext, program: &ShaderProgram) -> Result<Vec<u8>> {
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        self.encode_pass(&mut encoder, program);

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.render_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        gpu.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.output_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        gpu.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .context("Readback callback was dropped")?
            .context("Failed to map readback buffer")?;

        let data = buffer_slice.get_mapped_range();

        // Strip row padding
        let mut pixels = Vec::with_capacity((self.unpadded_bytes_per_row * self.height) as usize);
        for row in 0..self.height {
            let start = (row * self.padded_bytes_per_row) as usize;
            let end = start + self.unpadded_bytes_per_row as usize;
            pixels.extend_from_slice(&data[start..end]);
        }

        drop(data);
        self.output_buffer.unmap();

        Ok(pixels)
    }
}
