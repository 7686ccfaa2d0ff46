//! GPU textures: sampled colour maps and depth attachments.

use procgen::TextureData;
use wgpu::util::DeviceExt;

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self { texture, view, sampler }
    }

    /// Upload RGBA8 pixels. `repeat` selects repeat wrapping (noise, flow, tiled bark)
    /// over clamp (smoke puff, leaf cards).
    #[allow(clippy::too_many_arguments)]
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
        srgb: bool,
        repeat: bool,
        label: &str,
    ) -> Self {
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            pixels,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let address_mode = if repeat {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self { texture, view, sampler }
    }

    /// Upload a procedural or decoded texture. Data textures (noise, flow) stay linear.
    pub fn from_texture_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &TextureData,
        kind: TextureKind,
        label: &str,
    ) -> Self {
        Self::from_rgba8(
            device,
            queue,
            data.width,
            data.height,
            &data.to_bytes(),
            kind.is_color(),
            kind.repeats(),
            label,
        )
    }

    pub fn white_pixel(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_rgba8(device, queue, 1, 1, &[255, 255, 255, 255], true, true, "White Pixel")
    }
}

/// How a texture is interpreted by the programs that sample it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Tileable data: detail noise, flow map.
    Noise,
    /// Single-channel coverage sprite: smoke puff.
    Mask,
    /// Colour sprite with cutout alpha: leaf card.
    Sprite,
    /// Tiled colour map: bark, model albedo.
    Albedo,
}

impl TextureKind {
    pub fn is_color(self) -> bool {
        matches!(self, TextureKind::Sprite | TextureKind::Albedo)
    }

    pub fn repeats(self) -> bool {
        matches!(self, TextureKind::Noise | TextureKind::Albedo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_linear_and_tiled() {
        assert!(!TextureKind::Noise.is_color());
        assert!(TextureKind::Noise.repeats());
        assert!(!TextureKind::Sprite.repeats());
        assert!(!TextureKind::Mask.is_color());
        assert!(TextureKind::Albedo.is_color());
    }
}
