//! Main renderer: surface, camera, shared instance storage and the frame passes.

use std::ops::Range;
use std::sync::Arc;

use effects::{CloudUniform, FogSimulator, FogUniform, HomespaceUniform, SceneFog, TreePool, TreeUniform};
use procgen::TextureData;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::{Camera, CameraUniform};
use crate::cloud_pass::CloudPass;
use crate::depth_target::GpuDepthTarget;
use crate::error::{RenderError, Result};
use crate::fog_pass::FogPass;
use crate::instances::InstanceArena;
use crate::lit_pass::{LitPass, MaterialId};
use crate::mesh::{MeshData, MeshId, MeshLibrary};
use crate::pipeline::{create_camera_bind_group_layout, create_pipeline, PipelinePreset};
use crate::shaders::{with_camera, DEPTH_SHADER};
use crate::texture::{Texture, TextureKind};
use crate::tree_pass::{TreePass, TreeTextures};
use crate::vertex::{InstanceData, Vertex};

/// Model matrices per frame across every instanced draw.
pub const MAX_INSTANCES: u32 = 4096;

/// Sky behind the sea; same tint as the island distance fog.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 30.0 / 255.0,
    g: 115.0 / 255.0,
    b: 1.0,
    a: 1.0,
};

/// One mesh drawn `instances` times into the scene depth target.
#[derive(Debug, Clone)]
pub struct DepthDraw {
    pub mesh: MeshId,
    pub instances: Range<u32>,
}

#[derive(Debug, Clone)]
pub struct LitDraw {
    pub mesh: MeshId,
    pub material: MaterialId,
    pub instances: Range<u32>,
}

/// Everything the main pass draws, in draw order: lit models, trees, the
/// cloud surface, fog.
#[derive(Debug, Clone, Default)]
pub struct MainDraws {
    pub lit: Vec<LitDraw>,
    pub trees: Option<MeshId>,
    pub cloud: Option<(MeshId, Range<u32>)>,
    pub fog: Option<MeshId>,
}

/// A frame in flight.
pub struct Frame {
    pub output: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

pub struct Renderer {
    pub surface: wgpu::Surface<'static>,
    pub device: Arc<wgpu::Device>,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub window: Arc<Window>,

    camera_bind_group_layout: wgpu::BindGroupLayout,
    camera_bind_group: wgpu::BindGroup,
    camera_buffer: wgpu::Buffer,
    camera_uniform: CameraUniform,

    depth_texture: Texture,
    depth_pipeline: wgpu::RenderPipeline,
    instances: InstanceArena,
    meshes: MeshLibrary,

    lit: LitPass,
    cloud: Option<CloudPass>,
    fog: Option<FogPass>,
    trees: Option<TreePass>,
}

impl Renderer {
    /// Create a new renderer for the given window.
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;
        let device = Arc::new(device);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);

        let present_mode = if vsync {
            surface_caps
                .present_modes
                .iter()
                .find(|m| matches!(m, wgpu::PresentMode::Mailbox))
                .copied()
                .unwrap_or(wgpu::PresentMode::AutoVsync)
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout = create_camera_bind_group_layout(&device);
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let depth_texture = Texture::create_depth_texture(&device, config.width, config.height, "Depth Texture");
        let depth_pipeline = create_pipeline(
            &device,
            PipelinePreset::DepthOnly,
            "Scene Depth Pipeline",
            &with_camera(DEPTH_SHADER),
            &[Vertex::layout(), InstanceData::layout()],
            &[&camera_bind_group_layout],
            surface_format,
        );
        let lit = LitPass::new(&device, &camera_bind_group_layout, surface_format)?;
        let instances = InstanceArena::new(&device, MAX_INSTANCES);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            camera_bind_group_layout,
            camera_bind_group,
            camera_buffer,
            camera_uniform,
            depth_texture,
            depth_pipeline,
            instances,
            meshes: MeshLibrary::new(),
            lit,
            cloud: None,
            fog: None,
            trees: None,
        })
    }

    pub fn enable_cloud(&mut self, noise: &TextureData, flow: &TextureData) {
        self.cloud = Some(CloudPass::new(
            &self.device,
            &self.queue,
            &self.camera_bind_group_layout,
            self.config.format,
            noise,
            flow,
        ));
    }

    pub fn enable_fog(&mut self, smoke: &TextureData, simulator: &FogSimulator) {
        self.fog = Some(FogPass::new(
            &self.device,
            &self.queue,
            &self.camera_bind_group_layout,
            self.config.format,
            smoke,
            simulator,
        ));
    }

    pub fn enable_trees(&mut self, textures: TreeTextures<'_>, pool: &TreePool) {
        self.trees = Some(TreePass::new(
            &self.device,
            &self.queue,
            &self.camera_bind_group_layout,
            self.config.format,
            textures,
            pool,
        ));
    }

    pub fn add_mesh(&mut self, data: &MeshData) -> MeshId {
        log::debug!(
            "Uploading mesh `{}` ({} vertices, {} indices)",
            data.name,
            data.vertices.len(),
            data.indices.len()
        );
        self.meshes.insert(data.upload(&self.device))
    }

    pub fn create_texture(&self, data: &TextureData, kind: TextureKind, label: &str) -> Texture {
        Texture::from_texture_data(&self.device, &self.queue, data, kind, label)
    }

    pub fn white_texture(&self) -> Texture {
        Texture::white_pixel(&self.device, &self.queue)
    }

    pub fn lit_mut(&mut self) -> &mut LitPass {
        &mut self.lit
    }

    /// Handle window resize.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture =
                Texture::create_depth_texture(&self.device, self.config.width, self.config.height, "Depth Texture");
        }
    }

    pub fn update_camera(&mut self, camera: &Camera) {
        self.camera_uniform.update(camera, self.dimensions());
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[self.camera_uniform]));
    }

    pub fn update_cloud(&self, uniform: &CloudUniform) {
        if let Some(cloud) = &self.cloud {
            cloud.update(&self.queue, uniform);
        }
    }

    /// Write the fog uniform and any fog channels touched this frame.
    pub fn update_fog(&self, uniform: &FogUniform, simulator: &mut FogSimulator) {
        if let Some(fog) = &self.fog {
            fog.update(&self.queue, uniform);
            fog.upload(&self.queue, simulator);
        }
    }

    pub fn update_trees(&self, uniform: &TreeUniform) {
        if let Some(trees) = &self.trees {
            trees.update(&self.queue, uniform);
        }
    }

    pub fn update_lit(&self, light: HomespaceUniform, fog: Option<SceneFog>) {
        self.lit.update(&self.queue, light, fog);
    }

    /// Copy model matrices for one draw into this frame's instance buffer.
    pub fn push_instances(&mut self, instances: &[InstanceData]) -> Range<u32> {
        self.instances.push(&self.queue, instances)
    }

    /// Begin a new frame.
    pub fn begin_frame(&mut self) -> Result<Frame> {
        self.instances.reset();
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        Ok(Frame { output, view, encoder })
    }

    /// Render clip depth of `draws` into `target`. Both attachments are cleared
    /// to the far plane first.
    pub fn render_depth(&self, encoder: &mut wgpu::CommandEncoder, target: &GpuDepthTarget, draws: &[DepthDraw]) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Depth Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 1.0,
                        g: 0.0,
                        b: 0.0,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.depth_pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(1, self.instances.buffer().slice(..));
        for draw in draws {
            let Some(mesh) = self.meshes.get(draw.mesh) else {
                continue;
            };
            if draw.instances.is_empty() {
                continue;
            }
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.num_indices, 0, draw.instances.clone());
        }
    }

    /// Point the cloud material at the current scene depth textures.
    pub fn bind_depth_target(&mut self, target: &GpuDepthTarget) {
        if let Some(cloud) = &mut self.cloud {
            cloud.bind_target(&self.device, target);
        }
    }

    /// Draw the visible scene to the swap chain image.
    pub fn render_main(&self, frame: &mut Frame, draws: &MainDraws) {
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for draw in &draws.lit {
            if let Some(mesh) = self.meshes.get(draw.mesh) {
                self.lit
                    .draw(&mut pass, mesh, draw.material, self.instances.buffer(), draw.instances.clone());
            }
        }
        if let (Some(trees), Some(mesh)) = (&self.trees, draws.trees.and_then(|id| self.meshes.get(id))) {
            trees.draw(&mut pass, mesh);
        }
        if let (Some(cloud), Some((id, range))) = (&self.cloud, &draws.cloud) {
            if let Some(mesh) = self.meshes.get(*id) {
                cloud.draw(&mut pass, mesh, self.instances.buffer(), range.clone());
            }
        }
        if let (Some(fog), Some(mesh)) = (&self.fog, draws.fog.and_then(|id| self.meshes.get(id))) {
            fog.draw(&mut pass, mesh);
        }
    }

    /// End frame and present.
    pub fn end_frame(&self, frame: Frame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.output.present();
    }

    /// Get window dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }
}
