//! Frame driver: owns the renderer, the scene and every effect, and runs them
//! in a fixed order once per redraw.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use effects::fog::FOG_QUAD_SIZE;
use effects::islands::ISLAND_SCENE_FOG;
use effects::{
    CloudConfig, DepthCompositor, DepthFadeConfig, FogConfig, FogSimulator, FogUniform, HomespaceUniform,
    IslandBobber, Light, LightCache, LightKind, MaterialOverride, SceneFog, TreePool, TreeUniform, TREE_LAYOUT,
};
use engine_core::{FrameClock, ResizeBus, Transform, ViewportSize};
use glam::{Mat3, Mat4, Vec3};
use hecs::Entity;
use procgen::TextureGenerator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::{
    Camera, DepthDraw, GltfMesh, GpuDepthTarget, InstanceData, LitDraw, LitProgram, MainDraws, MeshData, RenderError,
    Renderer, Texture, TextureKind, TreeTextures, Vertex,
};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{DeviceEvent, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window};

use crate::assembly::{self, Readiness, TextureBank, TexturedEffect};
use crate::assets::{AssetEvent, AssetLoader, AssetPayload, AssetRequest, ModelSlot, TextureSlot};
use crate::config::{SceneConfig, TextureSource};
use crate::input::InputState;
use crate::scene::{DrawableKind, Scene};

const CAMERA_START: Vec3 = Vec3::new(0.0, 5.0, 60.0);
const CAMERA_TARGET: Vec3 = Vec3::new(0.0, -20.0, -100.0);

pub struct FrameDriver {
    config: SceneConfig,
    renderer: Renderer,
    scene: Scene,
    camera: Camera,
    input: InputState,
    clock: FrameClock,
    started: Instant,
    resize_bus: ResizeBus,
    /// Present while the cloud effect is enabled; runs the depth pre-pass
    /// once the cloud surface exists.
    compositor: Option<DepthCompositor<GpuDepthTarget, Entity>>,
    cloud_config: CloudConfig,
    fog_config: FogConfig,
    fog: Option<FogSimulator>,
    islands: IslandBobber,
    lights: Vec<Light>,
    light_cache: LightCache,
    scene_fog: Option<SceneFog>,
    loader: AssetLoader,
    textures: TextureBank,
    tree_model: Option<Vec<GltfMesh>>,
    /// Effects that were built or given up on.
    resolved: HashSet<TexturedEffect>,
    rng: StdRng,
    seed: u64,
}

impl FrameDriver {
    pub async fn new(window: Arc<Window>, config: SceneConfig) -> Result<Self> {
        let renderer = Renderer::new(window.clone(), config.vsync)
            .await
            .context("creating renderer")?;
        let seed = config.seed.unwrap_or_else(rand::random);
        log::info!("Scene seed {}", seed);

        let cloud_config = CloudConfig {
            subdivisions: config.cloud_subdivisions,
            ..CloudConfig::default()
        };
        let (width, height) = renderer.dimensions();

        let mut camera = Camera::new(CAMERA_START);
        camera.sensitivity *= config.sensitivity;
        camera.set_aspect(width, height);
        camera.look_at(CAMERA_TARGET);

        let resize_bus = ResizeBus::new();
        let compositor = if config.effects.cloud {
            let target = GpuDepthTarget::new(renderer.device.clone(), width, height);
            let mut compositor = DepthCompositor::new(target, &cloud_config, &DepthFadeConfig::default())
                .context("cloud depth compositor")?;
            compositor.subscribe(&resize_bus);
            Some(compositor)
        } else {
            None
        };

        let lights = vec![
            Light {
                kind: LightKind::Ambient,
                position: Vec3::ZERO,
            },
            Light {
                kind: LightKind::Directional,
                position: Vec3::from(config.sun_position),
            },
        ];

        let mut driver = Self {
            config,
            renderer,
            scene: Scene::new(),
            camera,
            input: InputState::new(),
            clock: FrameClock::new(),
            started: Instant::now(),
            resize_bus,
            compositor,
            cloud_config,
            fog_config: FogConfig::default(),
            fog: None,
            islands: IslandBobber::default(),
            lights,
            light_cache: LightCache::new(),
            scene_fog: None,
            loader: AssetLoader::new(),
            textures: TextureBank::new(),
            tree_model: None,
            resolved: HashSet::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
        };
        driver.on_resize(window.inner_size());
        driver.request_assets();
        Ok(driver)
    }

    fn effect_enabled(&self, effect: TexturedEffect) -> bool {
        match effect {
            TexturedEffect::Cloud => self.config.effects.cloud,
            TexturedEffect::Fog => self.config.effects.fog,
            TexturedEffect::Trees => self.config.effects.trees,
        }
    }

    /// Generate procedural textures now and start loading everything that
    /// comes from disk.
    fn request_assets(&mut self) {
        let wanted: HashSet<TextureSlot> = TexturedEffect::ALL
            .into_iter()
            .filter(|e| self.effect_enabled(*e))
            .flat_map(|e| e.textures().iter().copied())
            .collect();

        let mut generator = TextureGenerator::new(self.seed);
        for slot in TextureSlot::ALL {
            if !wanted.contains(&slot) {
                continue;
            }
            match self.config.textures.source(slot) {
                TextureSource::Procedural => self.textures.insert(slot, assembly::generate(slot, &mut generator)),
                TextureSource::File(path) => {
                    self.textures.mark_pending(slot);
                    self.loader
                        .request(AssetRequest::Texture(slot), self.config.asset_path(path));
                }
            }
        }

        let models = [
            (ModelSlot::Tree, self.config.effects.trees, &self.config.models.tree),
            (ModelSlot::Homespace, self.config.effects.homespace, &self.config.models.homespace),
            (ModelSlot::Islands, self.config.effects.islands, &self.config.models.islands),
        ];
        for (slot, enabled, path) in models {
            if enabled {
                self.loader
                    .request(AssetRequest::Model(slot), self.config.asset_path(path));
            }
        }
        log::info!("{} assets loading in the background", self.loader.in_flight());
    }

    fn drain_assets(&mut self) {
        for event in self.loader.poll() {
            match event {
                AssetEvent::Loaded {
                    request: AssetRequest::Texture(slot),
                    payload: AssetPayload::Texture(data),
                } => {
                    log::info!("Loaded {:?} texture ({}x{})", slot, data.width, data.height);
                    self.textures.insert(slot, data);
                }
                AssetEvent::Loaded {
                    request: AssetRequest::Model(slot),
                    payload: AssetPayload::Model(meshes),
                } => {
                    log::info!("Loaded {:?} model ({} meshes)", slot, meshes.len());
                    self.on_model(slot, meshes);
                }
                AssetEvent::Loaded { request, .. } => {
                    log::warn!("Asset {:?} produced the wrong kind of payload", request);
                }
                AssetEvent::Failed { request, error } => {
                    log::warn!("{}; {:?} will not appear", error, request);
                    match request {
                        AssetRequest::Texture(slot) => self.textures.fail(slot),
                        AssetRequest::Model(ModelSlot::Tree) => {
                            self.resolved.insert(TexturedEffect::Trees);
                        }
                        AssetRequest::Model(_) => {}
                    }
                }
            }
        }
        self.build_ready_effects();
    }

    fn on_model(&mut self, slot: ModelSlot, meshes: Vec<GltfMesh>) {
        if meshes.is_empty() {
            log::warn!("{:?} model has no meshes", slot);
            if slot == ModelSlot::Tree {
                self.resolved.insert(TexturedEffect::Trees);
            }
            return;
        }
        match slot {
            ModelSlot::Tree => self.tree_model = Some(meshes),
            ModelSlot::Homespace => self.build_homespace(&meshes),
            ModelSlot::Islands => self.build_islands(&meshes),
        }
    }

    fn build_ready_effects(&mut self) {
        for effect in TexturedEffect::ALL {
            if self.resolved.contains(&effect) || !self.effect_enabled(effect) {
                continue;
            }
            match self.textures.readiness(effect.textures()) {
                Readiness::Waiting => {}
                Readiness::Failed => {
                    log::warn!("{:?} disabled: one of its textures failed to load", effect);
                    self.resolved.insert(effect);
                }
                Readiness::Ready => {
                    if effect == TexturedEffect::Trees && self.tree_model.is_none() {
                        continue;
                    }
                    self.resolved.insert(effect);
                    if let Err(e) = self.build(effect) {
                        log::warn!("Could not build {:?}: {:#}", effect, e);
                    }
                }
            }
        }
    }

    fn build(&mut self, effect: TexturedEffect) -> Result<()> {
        let textures = &self.textures;
        let texture = |slot: TextureSlot| {
            textures
                .get(slot)
                .with_context(|| format!("{:?} texture missing", slot))
        };
        match effect {
            TexturedEffect::Cloud => {
                let compositor = self.compositor.as_mut().context("cloud compositor missing")?;
                self.renderer
                    .enable_cloud(texture(TextureSlot::DetailNoise)?, texture(TextureSlot::FlowMap)?);
                let plane = MeshData::plane_grid(self.cloud_config.plane_size, self.cloud_config.subdivisions);
                let mesh = self.renderer.add_mesh(&plane);
                let entity = self
                    .scene
                    .spawn_cloud(mesh, self.cloud_config.surface_transform().to_matrix());
                compositor.set_surface(entity);
                log::info!(
                    "Cloud sea ready ({} segments per side)",
                    self.cloud_config.subdivisions
                );
            }
            TexturedEffect::Fog => {
                let simulator = FogSimulator::from_seed(self.fog_config.clone(), self.seed)?;
                self.renderer.enable_fog(texture(TextureSlot::Smoke)?, &simulator);
                let mesh = self.renderer.add_mesh(&MeshData::billboard_quad(FOG_QUAD_SIZE));
                self.scene.spawn_fog(mesh);
                self.fog = Some(simulator);
            }
            TexturedEffect::Trees => {
                let meshes = self.tree_model.take().context("tree model missing")?;
                let pool = TreePool::new(&TREE_LAYOUT)?;
                let tree_textures = TreeTextures {
                    noise: texture(TextureSlot::DetailNoise)?,
                    leaf_one: texture(TextureSlot::LeafOne)?,
                    leaf_two: texture(TextureSlot::LeafTwo)?,
                    bark: texture(TextureSlot::Bark)?,
                };
                self.renderer.enable_trees(tree_textures, &pool);
                let mesh = self.renderer.add_mesh(&merge_meshes("tree", &meshes));
                self.scene.spawn_trees(mesh, pool.model_matrices());
                log::info!("{} trees planted", pool.len());
            }
        }
        Ok(())
    }

    fn lit_texture(&self, mesh: &GltfMesh) -> Texture {
        match &mesh.base_color {
            Some(data) => self
                .renderer
                .create_texture(data, TextureKind::Albedo, &mesh.data.name),
            None => self.renderer.white_texture(),
        }
    }

    /// Homespace parts never occlude the cloud depth read.
    fn build_homespace(&mut self, meshes: &[GltfMesh]) {
        let device = self.renderer.device.clone();
        for m in meshes {
            let mesh = self.renderer.add_mesh(&m.data);
            let texture = self.lit_texture(m);
            let material = MaterialOverride::for_mesh(&m.data.name).unwrap_or_default();
            let material = self
                .renderer
                .lit_mut()
                .add_material(&device, LitProgram::Homespace, material, texture);
            let entity = self
                .scene
                .spawn_lit(&m.data.name, DrawableKind::Homespace, mesh, material, m.transform);
            if let Some(compositor) = &mut self.compositor {
                compositor.hide_during_pass(entity);
            }
        }
        log::info!("Homespace ready ({} parts)", meshes.len());
    }

    fn build_islands(&mut self, meshes: &[GltfMesh]) {
        let device = self.renderer.device.clone();
        let rest: Vec<Transform> = meshes.iter().map(|m| rest_transform(m.transform)).collect();
        self.islands = IslandBobber::new(&rest, &mut self.rng);
        let matrices = self.islands.world_matrices();
        for (index, (m, matrix)) in meshes.iter().zip(matrices).enumerate() {
            let mesh = self.renderer.add_mesh(&m.data);
            let texture = self.lit_texture(m);
            let material = self.renderer.lit_mut().add_material(
                &device,
                LitProgram::Standard,
                MaterialOverride::default(),
                texture,
            );
            self.scene.spawn_island(&m.data.name, mesh, material, index, matrix);
        }
        self.scene_fog = Some(ISLAND_SCENE_FOG);
        log::info!("{} island pieces floating, scene fog on", meshes.len());
    }

    fn set_cursor_locked(&mut self, locked: bool) {
        let window = &self.renderer.window;
        if locked {
            let _ = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        } else {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
        }
        window.set_cursor_visible(!locked);
        self.input.set_cursor_locked(locked);
    }

    fn on_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.renderer.resize(size);
        self.camera.set_aspect(size.width, size.height);
        let viewport = viewport_size(size, self.renderer.window.scale_factor(), self.config.pixel_ratio);
        self.resize_bus.publish(viewport);
    }

    /// Returns true when the application should exit.
    pub fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => return true,
            WindowEvent::Resized(size) => self.on_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.renderer.window.inner_size();
                self.on_resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.process_mouse_button(button, state);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render_frame() {
                    log::error!("Frame failed: {:#}", e);
                }
                self.renderer.window.request_redraw();
            }
            _ => {}
        }
        false
    }

    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_motion(delta);
        }
    }

    fn update_camera(&mut self, dt: f32) {
        if self.input.is_key_pressed(KeyCode::Escape) {
            self.set_cursor_locked(false);
        }
        if self.input.is_mouse_pressed(MouseButton::Left) && !self.input.is_cursor_locked() {
            self.set_cursor_locked(true);
        }
        self.input.begin_frame();

        let look = self.input.mouse_delta();
        self.camera.process_mouse(look.x, look.y);
        self.camera.process_fly(
            self.input.get_movement_input(),
            self.input.get_vertical_input(),
            self.config.move_speed,
            dt,
        );
    }

    fn main_draws(&mut self) -> MainDraws {
        let batches = self.scene.main_batches();
        let renderer = &mut self.renderer;
        let lit = batches
            .lit
            .iter()
            .map(|&(mesh, material, matrix)| LitDraw {
                mesh,
                material,
                instances: renderer.push_instances(&[InstanceData::new(matrix)]),
            })
            .collect();
        let cloud = batches
            .cloud
            .map(|(mesh, matrix)| (mesh, renderer.push_instances(&[InstanceData::new(matrix)])));
        MainDraws {
            lit,
            trees: batches.trees,
            cloud,
            fog: batches.fog,
        }
    }

    /// One frame: clock, lights, islands, fog, uniforms, depth pre-pass, main pass.
    pub fn render_frame(&mut self) -> Result<()> {
        self.drain_assets();

        self.clock.advance(self.started.elapsed().as_secs_f64() * 1000.0);
        let seconds = self.clock.seconds();
        self.update_camera(self.clock.delta_seconds());

        self.light_cache.poll(&self.lights);
        let light = self.light_cache.position().unwrap_or_default();

        self.islands.tick(seconds);
        self.scene.update_islands(&self.islands);
        if let Some(fog) = &mut self.fog {
            fog.tick();
        }

        self.renderer.update_camera(&self.camera);
        self.renderer
            .update_trees(&TreeUniform::new(light, self.camera.position(), seconds));
        self.renderer
            .update_lit(HomespaceUniform::new(light, seconds), self.scene_fog);
        if let Some(fog) = &mut self.fog {
            let uniform = FogUniform::new(self.camera.rotation(), seconds, self.fog_config.group_offset_y);
            self.renderer.update_fog(&uniform, fog);
        }

        let mut frame = match self.renderer.begin_frame() {
            Ok(frame) => frame,
            Err(RenderError::Frame(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let size = self.renderer.size;
                self.renderer.resize(size);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(compositor) = &mut self.compositor {
            compositor.set_time(seconds);
            compositor.set_camera_range(self.camera.near, self.camera.far);
            if compositor.surface().is_some() {
                let renderer = &mut self.renderer;
                let encoder = &mut frame.encoder;
                compositor.render_depth_pass(&mut self.scene, |scene, target| {
                    let draws: Vec<DepthDraw> = scene
                        .depth_batches()
                        .into_iter()
                        .map(|batch| {
                            let instances: Vec<InstanceData> =
                                batch.matrices.iter().map(|m| InstanceData::new(*m)).collect();
                            DepthDraw {
                                mesh: batch.mesh,
                                instances: renderer.push_instances(&instances),
                            }
                        })
                        .collect();
                    renderer.render_depth(encoder, target, &draws);
                    Ok::<(), anyhow::Error>(())
                })?;
                self.renderer.update_cloud(compositor.uniform());
                self.renderer.bind_depth_target(compositor.target());
            }
        }

        let draws = self.main_draws();
        self.renderer.render_main(&mut frame, &draws);
        self.renderer.end_frame(frame);
        Ok(())
    }
}

/// Viewport the depth target is sized from. Without an override the surface's
/// physical size passes straight through, so the target matches it exactly.
pub fn viewport_size(physical: PhysicalSize<u32>, scale_factor: f64, ratio_override: Option<f32>) -> ViewportSize {
    match ratio_override {
        Some(ratio) => {
            let logical: LogicalSize<u32> = physical.to_logical(scale_factor);
            ViewportSize::new(logical.width, logical.height, ratio)
        }
        None => ViewportSize::new(physical.width, physical.height, 1.0),
    }
}

/// Authored pose of an island piece, split out of its glTF matrix.
pub fn rest_transform(matrix: Mat4) -> Transform {
    let (scale, rotation, position) = matrix.to_scale_rotation_translation();
    Transform {
        position,
        rotation,
        scale,
    }
}

/// Bake every primitive's node transform into one mesh.
pub fn merge_meshes(name: &str, meshes: &[GltfMesh]) -> MeshData {
    let mut merged = MeshData::new(name);
    for m in meshes {
        let base = merged.vertices.len() as u32;
        let normal_matrix = Mat3::from_mat4(m.transform).inverse().transpose();
        merged.vertices.extend(m.data.vertices.iter().map(|v| {
            let position = m.transform.transform_point3(Vec3::from(v.position));
            let normal = (normal_matrix * Vec3::from(v.normal)).normalize_or_zero();
            Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
                ..*v
            }
        }));
        merged.indices.extend(m.data.indices.iter().map(|i| i + base));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(name: &str, transform: Mat4) -> GltfMesh {
        let mut data = MeshData::new(name);
        data.vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex::with_color([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0], [0.5, 0.0, 0.0, 1.0]),
            Vertex::new([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        data.indices = vec![0, 1, 2];
        GltfMesh {
            data,
            transform,
            base_color: None,
        }
    }

    #[test]
    fn merged_mesh_offsets_indices_and_bakes_transforms() {
        let meshes = [
            triangle("trunk", Mat4::IDENTITY),
            triangle("leaves", Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))),
        ];
        let merged = merge_meshes("tree", &meshes);
        assert_eq!(merged.name, "tree");
        assert_eq!(merged.vertices.len(), 6);
        assert_eq!(merged.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(merged.vertices[4].position, [1.0, 2.0, 0.0]);
        assert_eq!(merged.vertices[4].color, [0.5, 0.0, 0.0, 1.0]);
        assert_eq!(merged.vertices[4].tex_coords, [1.0, 0.0]);
    }

    #[test]
    fn merged_normals_stay_unit_under_scale() {
        let meshes = [triangle("leaves", Mat4::from_scale(Vec3::new(3.0, 0.5, 3.0)))];
        let merged = merge_meshes("tree", &meshes);
        let n = Vec3::from(merged.vertices[0].normal);
        assert!((n - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn rest_transform_recovers_authored_pose() {
        let t = Transform::from_scale_yaw_position(2.0, 0.5, Vec3::new(1.0, 7.0, -3.0));
        let back = rest_transform(t.to_matrix());
        assert!((back.position - t.position).length() < 1e-5);
        assert!((back.scale - t.scale).length() < 1e-5);
        assert!(back.rotation.angle_between(t.rotation) < 1e-4);
    }

    #[test]
    fn viewport_uses_window_scale_unless_overridden() {
        let physical = PhysicalSize::new(2560, 1440);
        let v = viewport_size(physical, 2.0, None);
        assert_eq!(v.device_pixels(), (2560, 1440));

        let v = viewport_size(physical, 2.0, Some(1.0));
        assert_eq!(v.device_pixels(), (1280, 720));
    }

    #[test]
    fn fractional_scale_keeps_target_on_surface_size() {
        let physical = PhysicalSize::new(1000, 601);
        let v = viewport_size(physical, 1.75, None);
        assert_eq!(v.device_pixels(), (1000, 601));
    }
}
