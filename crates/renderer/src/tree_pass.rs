//! Instanced trees.

use bytemuck::Zeroable;
use effects::{TreePool, TreeUniform};
use procgen::TextureData;
use wgpu::util::DeviceExt;

use crate::instances::ChannelBuffers;
use crate::mesh::Mesh;
use crate::pipeline::{create_pipeline, create_tree_bind_group_layout, PipelinePreset};
use crate::shaders::{with_camera, TREE_SHADER};
use crate::texture::{Texture, TextureKind};
use crate::vertex::{tree_channel_layouts, ChannelLayout, Vertex};

/// Source images for the tree material.
pub struct TreeTextures<'a> {
    pub noise: &'a TextureData,
    pub leaf_one: &'a TextureData,
    pub leaf_two: &'a TextureData,
    pub bark: &'a TextureData,
}

pub struct TreePass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    channels: ChannelBuffers,
    layouts: [ChannelLayout; 4],
}

impl TreePass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        textures: TreeTextures<'_>,
        pool: &TreePool,
    ) -> Self {
        let layouts = tree_channel_layouts();
        let layout = create_tree_bind_group_layout(device);
        let mut buffers = vec![Vertex::layout()];
        buffers.extend(layouts.iter().map(ChannelLayout::layout));
        let pipeline = create_pipeline(
            device,
            PipelinePreset::Cutout,
            "Tree Pipeline",
            &with_camera(TREE_SHADER),
            &buffers,
            &[camera_layout, &layout],
            surface_format,
        );

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Tree Uniform"),
            contents: bytemuck::bytes_of(&TreeUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let noise = Texture::from_texture_data(device, queue, textures.noise, TextureKind::Noise, "Tree Wind Noise");
        let leaf_one = Texture::from_texture_data(device, queue, textures.leaf_one, TextureKind::Sprite, "Leaf One");
        let leaf_two = Texture::from_texture_data(device, queue, textures.leaf_two, TextureKind::Sprite, "Leaf Two");
        let bark = Texture::from_texture_data(device, queue, textures.bark, TextureKind::Albedo, "Bark");

        fn view(binding: u32, texture: &Texture) -> wgpu::BindGroupEntry<'_> {
            wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            }
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tree Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                view(1, &noise),
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&noise.sampler),
                },
                view(3, &leaf_one),
                view(4, &leaf_two),
                view(5, &bark),
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&leaf_one.sampler),
                },
            ],
        });

        let channels = ChannelBuffers::new(device, "Tree", &pool.channel_bytes(), pool.len() as u32);
        log::info!("Tree pass ready with {} instances", pool.len());

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            channels,
            layouts,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, uniform: &TreeUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, mesh: &Mesh) {
        if self.channels.instance_count() == 0 || !self.channels.covers(&self.layouts) {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.channels.bind(pass, 1, &self.layouts);
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.num_indices, 0, 0..self.channels.instance_count());
    }
}
