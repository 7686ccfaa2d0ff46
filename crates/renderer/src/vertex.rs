//! Vertex types and layouts for rendering.

use bytemuck::{Pod, Zeroable};
use effects::ChannelId;

/// Standard vertex with position, normal, UV coordinates, and color.
///
/// The tree mesh bakes its foliage mask into the red channel of `color`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn with_color(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2], color: [f32; 4]) -> Self {
        Self { position, normal, tex_coords, color }
    }

    /// Locations 0..=3: position, normal, uv, color.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Per-instance model matrix for the lit and depth-only programs.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
}

impl InstanceData {
    pub fn new(model: glam::Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }

    /// Locations 4..=7: the four matrix columns.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

impl Default for InstanceData {
    fn default() -> Self {
        Self::new(glam::Mat4::IDENTITY)
    }
}

/// Vertex format of one instance attribute channel.
pub fn channel_format(id: ChannelId) -> wgpu::VertexFormat {
    match id {
        ChannelId::Positions | ChannelId::Scales => wgpu::VertexFormat::Float32x3,
        ChannelId::Opacity
        | ChannelId::Distortion
        | ChannelId::TextureRotation
        | ChannelId::Rotation
        | ChannelId::LeafType => wgpu::VertexFormat::Float32,
    }
}

/// One instance-rate vertex buffer per attribute channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelLayout {
    pub id: ChannelId,
    attribute: [wgpu::VertexAttribute; 1],
}

impl ChannelLayout {
    pub fn new(id: ChannelId, shader_location: u32) -> Self {
        Self {
            id,
            attribute: [wgpu::VertexAttribute {
                offset: 0,
                shader_location,
                format: channel_format(id),
            }],
        }
    }

    pub fn stride(&self) -> wgpu::BufferAddress {
        self.attribute[0].format.size()
    }

    pub fn layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride(),
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &self.attribute,
        }
    }
}

/// Fog instance channels in shader location order, starting after the vertex attributes.
pub fn fog_channel_layouts() -> [ChannelLayout; 5] {
    [
        ChannelLayout::new(ChannelId::Positions, 4),
        ChannelLayout::new(ChannelId::Scales, 5),
        ChannelLayout::new(ChannelId::Opacity, 6),
        ChannelLayout::new(ChannelId::Distortion, 7),
        ChannelLayout::new(ChannelId::TextureRotation, 8),
    ]
}

pub fn tree_channel_layouts() -> [ChannelLayout; 4] {
    [
        ChannelLayout::new(ChannelId::Positions, 4),
        ChannelLayout::new(ChannelId::Scales, 5),
        ChannelLayout::new(ChannelId::Rotation, 6),
        ChannelLayout::new(ChannelId::LeafType, 7),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        assert_eq!(Vertex::layout().attributes.len(), 4);
    }

    #[test]
    fn instance_matrix_columns_follow_vertex_locations() {
        let layout = InstanceData::layout();
        assert_eq!(layout.array_stride, 64);
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![4, 5, 6, 7]);
    }

    #[test]
    fn channel_strides_match_cpu_storage() {
        for layout in fog_channel_layouts() {
            let expected = match layout.id {
                ChannelId::Positions | ChannelId::Scales => 12,
                _ => 4,
            };
            assert_eq!(layout.stride(), expected, "{:?}", layout.id);
            assert_eq!(layout.layout().step_mode, wgpu::VertexStepMode::Instance);
        }
    }

    #[test]
    fn channel_locations_do_not_collide_with_vertex() {
        for layout in tree_channel_layouts().iter().chain(fog_channel_layouts().iter()) {
            assert!(layout.layout().attributes[0].shader_location >= 4);
        }
    }
}
