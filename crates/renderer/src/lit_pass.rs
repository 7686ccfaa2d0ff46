//! Lit models. Two programs are composed from the same hooked source: the
//! patched homespace material and the plain map-multiply one.

use std::ops::Range;

use bytemuck::Zeroable;
use effects::homespace::{default_fills, homespace_fills};
use effects::{HomespaceUniform, MaterialOverride, SceneFog, ShaderComposer};
use wgpu::util::DeviceExt;

use crate::error::Result;
use crate::mesh::Mesh;
use crate::pipeline::{create_lit_bind_group_layout, create_pipeline, LitUniform, PipelinePreset};
use crate::shaders::{with_camera, LIT_SHADER};
use crate::texture::Texture;
use crate::vertex::{InstanceData, Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitProgram {
    Homespace,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

struct LitMaterial {
    program: LitProgram,
    material: MaterialOverride,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    _texture: Texture,
}

pub struct LitPass {
    homespace_pipeline: wgpu::RenderPipeline,
    standard_pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    materials: Vec<LitMaterial>,
}

/// Compose the lit source for `program`.
pub fn lit_source(program: LitProgram) -> Result<String> {
    let fills = match program {
        LitProgram::Homespace => homespace_fills(),
        LitProgram::Standard => default_fills(),
    };
    Ok(with_camera(&ShaderComposer::compose(LIT_SHADER, &fills)?))
}

impl LitPass {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let layout = create_lit_bind_group_layout(device);
        let buffers = [Vertex::layout(), InstanceData::layout()];
        let homespace_pipeline = create_pipeline(
            device,
            PipelinePreset::Opaque,
            "Homespace Pipeline",
            &lit_source(LitProgram::Homespace)?,
            &buffers,
            &[camera_layout, &layout],
            surface_format,
        );
        let standard_pipeline = create_pipeline(
            device,
            PipelinePreset::Opaque,
            "Lit Pipeline",
            &lit_source(LitProgram::Standard)?,
            &buffers,
            &[camera_layout, &layout],
            surface_format,
        );
        Ok(Self {
            homespace_pipeline,
            standard_pipeline,
            layout,
            materials: Vec::new(),
        })
    }

    /// Register a material. `texture` is the base colour map (a white pixel
    /// for untextured meshes).
    pub fn add_material(
        &mut self,
        device: &wgpu::Device,
        program: LitProgram,
        material: MaterialOverride,
        texture: Texture,
    ) -> MaterialId {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lit Material Uniform"),
            contents: bytemuck::bytes_of(&LitUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lit Material Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(LitMaterial {
            program,
            material,
            uniform_buffer,
            bind_group,
            _texture: texture,
        });
        id
    }

    /// Refresh light, time and scene fog on every material.
    pub fn update(&self, queue: &wgpu::Queue, light: HomespaceUniform, fog: Option<SceneFog>) {
        for m in &self.materials {
            let uniform = LitUniform::new(light, fog, m.material);
            queue.write_buffer(&m.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
        }
    }

    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        mesh: &Mesh,
        material: MaterialId,
        instances: &wgpu::Buffer,
        range: Range<u32>,
    ) {
        let Some(m) = self.materials.get(material.0 as usize) else {
            log::warn!("Unknown lit material {:?}", material);
            return;
        };
        if range.is_empty() {
            return;
        }
        let pipeline = match m.program {
            LitProgram::Homespace => &self.homespace_pipeline,
            LitProgram::Standard => &self.standard_pipeline,
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(1, &m.bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, instances.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.num_indices, 0, range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_programs_compose() {
        let homespace = lit_source(LitProgram::Homespace).unwrap();
        let standard = lit_source(LitProgram::Standard).unwrap();
        assert!(homespace.contains("wrap_ramp_nl"));
        assert!(!standard.contains("wrap_ramp_nl"));
        assert!(homespace.contains("struct Camera"));
    }
}
