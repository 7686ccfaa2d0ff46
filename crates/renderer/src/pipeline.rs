//! Pipeline presets and bind group layouts shared by the render passes.

use bytemuck::{Pod, Zeroable};
use effects::{HomespaceUniform, MaterialOverride, SceneFog};
use wgpu::*;

use crate::texture::Texture;

/// Colour format of the offscreen scene-depth target.
pub const SCENE_DEPTH_FORMAT: TextureFormat = TextureFormat::R32Float;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePreset {
    /// Lit models: islands, homespace.
    Opaque,
    /// Alpha-tested double-sided cards: trees.
    Cutout,
    /// Double-sided, blended, still writes depth: the cloud surface.
    Translucent,
    /// Double-sided, blended, depth-tested only: fog billboards.
    TranslucentNoDepthWrite,
    /// Scene depth into an R32Float target.
    DepthOnly,
}

impl PipelinePreset {
    fn cull_mode(&self) -> Option<Face> {
        match self {
            PipelinePreset::Opaque => Some(Face::Back),
            _ => None,
        }
    }

    fn blend(&self) -> Option<BlendState> {
        match self {
            PipelinePreset::Cutout
            | PipelinePreset::Translucent
            | PipelinePreset::TranslucentNoDepthWrite => Some(BlendState::ALPHA_BLENDING),
            _ => None,
        }
    }

    fn depth_write_enabled(&self) -> bool {
        !matches!(self, PipelinePreset::TranslucentNoDepthWrite)
    }

    fn color_format(&self, surface_format: TextureFormat) -> TextureFormat {
        match self {
            PipelinePreset::DepthOnly => SCENE_DEPTH_FORMAT,
            _ => surface_format,
        }
    }
}

/// Build a render pipeline. Group 0 is always the camera.
pub fn create_pipeline(
    device: &Device,
    preset: PipelinePreset,
    label: &str,
    shader_source: &str,
    vertex_layouts: &[VertexBufferLayout],
    bind_group_layouts: &[&BindGroupLayout],
    surface_format: TextureFormat,
) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(shader_source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    let target = Some(ColorTargetState {
        format: preset.color_format(surface_format),
        blend: preset.blend(),
        write_mask: ColorWrites::ALL,
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        cache: None,
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: vertex_layouts,
        },
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: preset.cull_mode(),
            unclipped_depth: false,
            polygon_mode: PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_compare: CompareFunction::Less,
            depth_write_enabled: preset.depth_write_enabled(),
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[target],
        }),
        multiview: None,
    })
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, visibility: ShaderStages, sample_type: TextureSampleType) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Texture {
            multisampled: false,
            view_dimension: TextureViewDimension::D2,
            sample_type,
        },
        count: None,
    }
}

fn filterable(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    texture_entry(binding, visibility, TextureSampleType::Float { filterable: true })
}

fn sampler_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Sampler(SamplerBindingType::Filtering),
        count: None,
    }
}

pub fn create_camera_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Camera Bind Group Layout"),
        entries: &[uniform_entry(0, ShaderStages::VERTEX_FRAGMENT)],
    })
}

/// Cloud material: uniform, noise, flow, repeat sampler, scene depth, mask depth.
pub fn create_cloud_bind_group_layout(device: &Device) -> BindGroupLayout {
    let both = ShaderStages::VERTEX_FRAGMENT;
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Cloud Bind Group Layout"),
        entries: &[
            uniform_entry(0, both),
            filterable(1, both),
            filterable(2, both),
            sampler_entry(3, both),
            texture_entry(4, ShaderStages::FRAGMENT, TextureSampleType::Float { filterable: false }),
            texture_entry(5, ShaderStages::FRAGMENT, TextureSampleType::Depth),
        ],
    })
}

pub fn create_fog_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Fog Bind Group Layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX_FRAGMENT),
            filterable(1, ShaderStages::FRAGMENT),
            sampler_entry(2, ShaderStages::FRAGMENT),
        ],
    })
}

/// Tree material: uniform, wind noise, repeat sampler, two leaf cards, bark, clamp sampler.
pub fn create_tree_bind_group_layout(device: &Device) -> BindGroupLayout {
    let both = ShaderStages::VERTEX_FRAGMENT;
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Tree Bind Group Layout"),
        entries: &[
            uniform_entry(0, both),
            filterable(1, both),
            sampler_entry(2, both),
            filterable(3, ShaderStages::FRAGMENT),
            filterable(4, ShaderStages::FRAGMENT),
            filterable(5, ShaderStages::FRAGMENT),
            sampler_entry(6, ShaderStages::FRAGMENT),
        ],
    })
}

pub fn create_lit_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Lit Bind Group Layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX_FRAGMENT),
            filterable(1, ShaderStages::FRAGMENT),
            sampler_entry(2, ShaderStages::FRAGMENT),
        ],
    })
}

/// Material block of the lit program.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LitUniform {
    pub light_pos: [f32; 3],
    pub time: f32,
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub _pad: [f32; 2],
}

impl LitUniform {
    /// Light and time from the homespace block, exp² fog if the scene has it,
    /// and the mesh's material override.
    pub fn new(light: HomespaceUniform, fog: Option<SceneFog>, material: MaterialOverride) -> Self {
        let (fog_color, fog_density) = match fog {
            Some(fog) => (fog.color.to_array(), fog.density),
            None => ([0.0; 3], 0.0),
        };
        Self {
            light_pos: light.light_pos,
            time: light.time,
            fog_color,
            fog_density,
            roughness: material.roughness,
            metalness: material.metalness,
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_pipeline_preset_cull() {
        assert_eq!(PipelinePreset::Opaque.cull_mode(), Some(Face::Back));
        assert_eq!(PipelinePreset::Cutout.cull_mode(), None);
        assert_eq!(PipelinePreset::Translucent.cull_mode(), None);
        assert_eq!(PipelinePreset::TranslucentNoDepthWrite.cull_mode(), None);
        assert_eq!(PipelinePreset::DepthOnly.cull_mode(), None);
    }

    #[test]
    fn test_pipeline_preset_depth_write() {
        assert!(PipelinePreset::Opaque.depth_write_enabled());
        assert!(PipelinePreset::Cutout.depth_write_enabled());
        assert!(PipelinePreset::Translucent.depth_write_enabled());
        assert!(!PipelinePreset::TranslucentNoDepthWrite.depth_write_enabled());
        assert!(PipelinePreset::DepthOnly.depth_write_enabled());
    }

    #[test]
    fn test_pipeline_preset_blend() {
        assert!(PipelinePreset::Opaque.blend().is_none());
        assert!(PipelinePreset::Cutout.blend().is_some());
        assert!(PipelinePreset::Translucent.blend().is_some());
        assert!(PipelinePreset::TranslucentNoDepthWrite.blend().is_some());
        assert!(PipelinePreset::DepthOnly.blend().is_none());
    }

    #[test]
    fn test_depth_only_targets_float_texture() {
        let surface = TextureFormat::Bgra8UnormSrgb;
        assert_eq!(PipelinePreset::DepthOnly.color_format(surface), TextureFormat::R32Float);
        assert_eq!(PipelinePreset::Opaque.color_format(surface), surface);
    }

    #[test]
    fn lit_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LitUniform>(), 48);
        assert_eq!(std::mem::offset_of!(LitUniform, fog_color), 16);
        assert_eq!(std::mem::offset_of!(LitUniform, roughness), 32);
    }

    #[test]
    fn lit_uniform_without_fog_is_clear() {
        let light = HomespaceUniform::new(Vec3::new(1.0, 2.0, 3.0), 4.0);
        let lit = LitUniform::new(light, None, MaterialOverride::default());
        assert_eq!(lit.fog_density, 0.0);
        assert_eq!(lit.light_pos, [1.0, 2.0, 3.0]);
        assert_eq!(lit.time, 4.0);
    }
}
