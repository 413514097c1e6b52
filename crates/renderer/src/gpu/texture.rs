use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::{RenderError, RenderResult};
use crate::types::SourceImage;

/// The single live source-image texture and its bind group.
pub(crate) struct SourceTexture {
    texture: wgpu::Texture,
    sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
    pub size: (u32, u32),
}

impl SourceTexture {
    /// A 1x1 transparent texture bound until the first real upload.
    pub(crate) fn placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("source image sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let texture = create_texture(device, queue, 1, 1, &[0, 0, 0, 0]);
        let bind_group = create_bind_group(device, layout, &texture, &sampler);
        Self {
            texture,
            sampler,
            bind_group,
            size: (1, 1),
        }
    }

    /// Swaps in a new image. The old texture is destroyed before the new one
    /// is created, so at most one source texture exists at a time.
    pub(crate) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        max_dimension: u32,
        image: &SourceImage,
    ) -> RenderResult<()> {
        let (width, height) = (image.width(), image.height());
        if width > max_dimension || height > max_dimension {
            return Err(RenderError::TextureUploadFailed(format!(
                "{width}x{height} exceeds the GPU texture limit of {max_dimension}"
            )));
        }

        self.texture.destroy();
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = create_texture(device, queue, width, height, image.pixels());
        let bind_group = create_bind_group(device, layout, &texture, &self.sampler);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            texture.destroy();
            // Keep something valid bound so later draws stay legal.
            self.texture = create_texture(device, queue, 1, 1, &[0, 0, 0, 0]);
            self.bind_group = create_bind_group(device, layout, &self.texture, &self.sampler);
            self.size = (1, 1);
            return Err(RenderError::TextureUploadFailed(error.to_string()));
        }

        self.texture = texture;
        self.bind_group = bind_group;
        self.size = (width, height);
        tracing::debug!(width, height, "uploaded source image");
        Ok(())
    }
}

impl Drop for SourceTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("source image"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        pixels,
    )
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("source image bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
