use quantizer::RowOrder;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::error::{RenderError, RenderResult};
use crate::surface::{CapturedFrame, ShaderSurface};
use crate::types::{ShaderParameters, SourceImage};

use super::context::GpuContext;
use super::pipeline::{PipelineLayouts, ShaderPipeline, QUAD_VERTICES};
use super::texture::SourceTexture;
use super::uniforms::LiquidUniforms;

/// One fully independent wgpu instance of the liquid program.
///
/// Live preview and export each build their own `GpuState`; nothing is
/// shared between them.
pub struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    pipeline: ShaderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: LiquidUniforms,
    texture: SourceTexture,
}

impl GpuState {
    /// Context presenting to a window.
    pub fn for_window<T>(
        target: &T,
        size: PhysicalSize<u32>,
        fragment_source: &str,
    ) -> RenderResult<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::for_window(target, size)?;
        Self::from_context(context, fragment_source)
    }

    /// Context rendering into a readable `side` x `side` texture.
    pub fn offscreen(side: u32, fragment_source: &str) -> RenderResult<Self> {
        let context = GpuContext::offscreen(side)?;
        Self::from_context(context, fragment_source)
    }

    fn from_context(context: GpuContext, fragment_source: &str) -> RenderResult<Self> {
        let layouts = PipelineLayouts::new(&context.device);
        let pipeline =
            ShaderPipeline::new(&context.device, &layouts, context.format, fragment_source)?;

        let uniforms = LiquidUniforms::default();
        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("liquid uniform buffer"),
            size: std::mem::size_of::<LiquidUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("liquid uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
        context
            .queue
            .write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let texture = SourceTexture::placeholder(&context.device, &context.queue, &layouts.image_layout);

        Ok(Self {
            context,
            layouts,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            texture,
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    pub fn uniforms(&self) -> &LiquidUniforms {
        &self.uniforms
    }
}

impl ShaderSurface for GpuState {
    fn side(&self) -> u32 {
        self.context.side()
    }

    fn upload_image(&mut self, image: &SourceImage) -> RenderResult<()> {
        self.texture.upload(
            &self.context.device,
            &self.context.queue,
            &self.layouts.image_layout,
            self.context.max_dimension,
            image,
        )
    }

    fn set_uniforms(&mut self, params: &ShaderParameters, time_ms: f32, img_ratio: f32) {
        self.uniforms = LiquidUniforms::new(params, time_ms, img_ratio);
        self.context.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );
    }

    fn render(&mut self, clear: [f64; 4]) -> RenderResult<()> {
        let frame = self.context.acquire()?;
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("liquid render encoder"),
                });
        {
            let [r, g, b, a] = clear;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("liquid render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let (x, y, side) = self.context.viewport();
            pass.set_viewport(x, y, side, side, 0.0, 1.0);
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.texture.bind_group, &[]);
            pass.set_vertex_buffer(0, self.pipeline.vertex_buffer.slice(..));
            pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        if let Some(surface_texture) = frame.surface_texture {
            surface_texture.present();
        }
        Ok(())
    }

    fn read_pixels(&mut self) -> RenderResult<CapturedFrame> {
        let texture = self.context.offscreen_texture().ok_or_else(|| {
            RenderError::Readback("window surfaces cannot be read back".into())
        })?;
        let side = self.context.side();
        let unpadded = side * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let device = &self.context.device;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("export readback"),
            size: u64::from(padded) * u64::from(side),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("export readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(side),
                },
            },
            wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| RenderError::Readback(err.to_string()))?;
        receiver
            .recv()
            .map_err(|err| RenderError::Readback(err.to_string()))?
            .map_err(|err| RenderError::Readback(err.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded * side) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        staging.unmap();

        // Texture copies start at the top row.
        Ok(CapturedFrame {
            pixels,
            order: RowOrder::TopDown,
        })
    }

    fn dispose(self) {
        tracing::debug!(side = self.context.side(), "disposing GPU state");
        drop(self);
    }
}
