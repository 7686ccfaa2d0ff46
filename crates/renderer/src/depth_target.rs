//! Off-screen scene depth used by the cloud surface.

use std::sync::Arc;

use effects::DepthTarget;

use crate::pipeline::SCENE_DEPTH_FORMAT;
use crate::texture::Texture;

/// R32Float colour target holding clip depth, plus the Depth32Float
/// attachment of the same pass. The cloud program reads the first as the
/// scene depth and the second as the coverage mask.
pub struct GpuDepthTarget {
    device: Arc<wgpu::Device>,
    color_view: wgpu::TextureView,
    depth: Texture,
    size: (u32, u32),
    generation: u64,
}

impl GpuDepthTarget {
    pub fn new(device: Arc<wgpu::Device>, width: u32, height: u32) -> Self {
        let color_view = create_color(&device, width, height);
        let depth = Texture::create_depth_texture(&device, width, height, "Scene Depth Mask");
        Self {
            device,
            color_view,
            depth,
            size: (width.max(1), height.max(1)),
            generation: 0,
        }
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Bumped every time the textures are recreated; bind groups built
    /// against an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl DepthTarget for GpuDepthTarget {
    fn resize(&mut self, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return;
        }
        self.color_view = create_color(&self.device, size.0, size.1);
        self.depth = Texture::create_depth_texture(&self.device, size.0, size.1, "Scene Depth Mask");
        self.size = size;
        self.generation += 1;
        log::debug!("Scene depth target resized to {}x{}", size.0, size.1);
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

fn create_color(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SCENE_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
