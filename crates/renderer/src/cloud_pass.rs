//! Cloud surface draw: flow-map noise textures plus the scene depth target.

use std::ops::Range;

use bytemuck::Zeroable;
use effects::CloudUniform;
use procgen::TextureData;
use wgpu::util::DeviceExt;

use crate::depth_target::GpuDepthTarget;
use crate::mesh::Mesh;
use crate::pipeline::{create_cloud_bind_group_layout, create_pipeline, PipelinePreset};
use crate::shaders::{with_camera, CLOUD_SHADER};
use crate::texture::{Texture, TextureKind};
use crate::vertex::{InstanceData, Vertex};

pub struct CloudPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    noise: Texture,
    flow: Texture,
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl CloudPass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        noise: &TextureData,
        flow: &TextureData,
    ) -> Self {
        let layout = create_cloud_bind_group_layout(device);
        let pipeline = create_pipeline(
            device,
            PipelinePreset::Translucent,
            "Cloud Pipeline",
            &with_camera(CLOUD_SHADER),
            &[Vertex::layout(), InstanceData::layout()],
            &[camera_layout, &layout],
            surface_format,
        );
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cloud Uniform"),
            contents: bytemuck::bytes_of(&CloudUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            pipeline,
            layout,
            uniform_buffer,
            noise: Texture::from_texture_data(device, queue, noise, TextureKind::Noise, "Cloud Noise"),
            flow: Texture::from_texture_data(device, queue, flow, TextureKind::Noise, "Cloud Flow"),
            bind_group: None,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, uniform: &CloudUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Rebuild the bind group if the depth target was recreated since the last frame.
    pub fn bind_target(&mut self, device: &wgpu::Device, target: &GpuDepthTarget) {
        if matches!(&self.bind_group, Some((generation, _)) if *generation == target.generation()) {
            return;
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cloud Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&self.noise.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&self.flow.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.noise.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(target.color_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(target.depth_view()),
                },
            ],
        });
        self.bind_group = Some((target.generation(), bind_group));
    }

    /// Draw the surface. Does nothing until a depth target has been bound.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, mesh: &Mesh, instances: &wgpu::Buffer, range: Range<u32>) {
        let Some((_, bind_group)) = &self.bind_group else {
            return;
        };
        if range.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, instances.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.num_indices, 0, range);
    }
}
