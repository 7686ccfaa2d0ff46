//! Fog billboards: one instanced draw fed by the simulator's dirty channels.

use bytemuck::Zeroable;
use effects::{FogSimulator, FogUniform};
use procgen::TextureData;
use wgpu::util::DeviceExt;

use crate::instances::ChannelBuffers;
use crate::mesh::Mesh;
use crate::pipeline::{create_fog_bind_group_layout, create_pipeline, PipelinePreset};
use crate::shaders::{with_camera, FOG_SHADER};
use crate::texture::{Texture, TextureKind};
use crate::vertex::{fog_channel_layouts, ChannelLayout, Vertex};

pub struct FogPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    channels: ChannelBuffers,
    layouts: [ChannelLayout; 5],
}

impl FogPass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        smoke: &TextureData,
        simulator: &FogSimulator,
    ) -> Self {
        let layouts = fog_channel_layouts();
        let layout = create_fog_bind_group_layout(device);
        let mut buffers = vec![Vertex::layout()];
        buffers.extend(layouts.iter().map(ChannelLayout::layout));
        let pipeline = create_pipeline(
            device,
            PipelinePreset::TranslucentNoDepthWrite,
            "Fog Pipeline",
            &with_camera(FOG_SHADER),
            &buffers,
            &[camera_layout, &layout],
            surface_format,
        );

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fog Uniform"),
            contents: bytemuck::bytes_of(&FogUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let smoke = Texture::from_texture_data(device, queue, smoke, TextureKind::Mask, "Fog Smoke");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fog Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&smoke.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&smoke.sampler),
                },
            ],
        });

        let channels = ChannelBuffers::new(
            device,
            "Fog",
            &simulator.buffer().snapshot(),
            simulator.capacity() as u32,
        );

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            channels,
            layouts,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, uniform: &FogUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Push every channel the simulator touched since the last upload.
    pub fn upload(&self, queue: &wgpu::Queue, simulator: &mut FogSimulator) {
        simulator
            .buffer_mut()
            .drain_dirty(|id, bytes| self.channels.write(queue, id, bytes));
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
