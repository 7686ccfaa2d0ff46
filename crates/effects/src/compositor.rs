//! Depth pre-pass for the cloud surface.
//!
//! Once per frame, before the main pass, the scene is rendered into an
//! off-screen depth target with the cloud surface and a caller-supplied list
//! of occluders hidden. The cloud shader then samples that target to fade
//! itself out where it meets solid geometry.

use std::ops::{Deref, DerefMut};

use engine_core::{ResizeBus, ResizeSubscription, ViewportSize};

use crate::cloud::CloudConfig;
use crate::depth_fade::DepthFadeConfig;
use crate::error::Result;
use crate::uniforms::CloudUniform;

/// A resizable off-screen render target (colour + depth).
pub trait DepthTarget {
    fn resize(&mut self, width: u32, height: u32);
    fn size(&self) -> (u32, u32);
}

/// Visibility flags owned by the scene host.
pub trait SceneVisibility {
    type Id: Copy;

    /// Set the flag and return the previous one, or `None` if `id` is unknown.
    fn set_visible(&mut self, id: Self::Id, visible: bool) -> Option<bool>;
}

/// Hides a set of objects for as long as it lives.
///
/// Previous flags are restored in reverse order on drop, so a render closure
/// that returns early or panics still leaves the scene as it found it.
pub struct VisibilityScope<'a, S: SceneVisibility> {
    scene: &'a mut S,
    restore: Vec<(S::Id, bool)>,
}

impl<'a, S: SceneVisibility> VisibilityScope<'a, S> {
    pub fn hide(scene: &'a mut S, ids: impl IntoIterator<Item = S::Id>) -> Self {
        let mut restore = Vec::new();
        for id in ids {
            if let Some(previous) = scene.set_visible(id, false) {
                restore.push((id, previous));
            }
        }
        Self { scene, restore }
    }

    /// Number of objects whose flag this scope will restore.
    pub fn len(&self) -> usize {
        self.restore.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restore.is_empty()
    }
}

impl<S: SceneVisibility> Deref for VisibilityScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.scene
    }
}

impl<S: SceneVisibility> DerefMut for VisibilityScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.scene
    }
}

impl<S: SceneVisibility> Drop for VisibilityScope<'_, S> {
    fn drop(&mut self) {
        while let Some((id, previous)) = self.restore.pop() {
            self.scene.set_visible(id, previous);
        }
    }
}

pub struct DepthCompositor<T: DepthTarget, Id: Copy> {
    target: T,
    uniform: CloudUniform,
    surface: Option<Id>,
    hidden: Vec<Id>,
    subscription: Option<ResizeSubscription>,
}

impl<T: DepthTarget, Id: Copy> DepthCompositor<T, Id> {
    pub fn new(target: T, cloud: &CloudConfig, fade: &DepthFadeConfig) -> Result<Self> {
        cloud.validate()?;
        fade.validate()?;
        let uniform = CloudUniform::new(cloud, fade, target.size());
        Ok(Self {
            target,
            uniform,
            surface: None,
            hidden: Vec::new(),
            subscription: None,
        })
    }

    /// The surface that samples the depth target. Always hidden in the pass.
    pub fn set_surface(&mut self, id: Id) {
        self.surface = Some(id);
    }

    pub fn surface(&self) -> Option<Id> {
        self.surface
    }

    /// Objects that must not occlude the depth read.
    pub fn set_hidden(&mut self, ids: impl IntoIterator<Item = Id>) {
        self.hidden = ids.into_iter().collect();
    }

    pub fn hide_during_pass(&mut self, id: Id) {
        self.hidden.push(id);
    }

    pub fn hidden(&self) -> &[Id] {
        &self.hidden
    }

    /// Follow viewport changes published on `bus`. Replaces any previous subscription.
    pub fn subscribe(&mut self, bus: &ResizeBus) {
        self.subscription = Some(bus.subscribe());
    }

    /// Resize the target and the resolution uniform together.
    pub fn on_resize(&mut self, width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
        let (w, h) = ViewportSize::new(width, height, pixel_ratio).device_pixels();
        self.target.resize(w, h);
        self.uniform.resolution = [w as f32, h as f32];
        log::debug!("depth target resized to {w}x{h}");
        (w, h)
    }

    /// Apply the latest size parked on the subscription, if any.
    pub fn apply_pending_resize(&mut self) -> bool {
        let pending = self.subscription.as_ref().and_then(|s| s.take_pending());
        match pending {
            Some(size) => {
                self.on_resize(size.width, size.height, size.pixel_ratio);
                true
            }
            None => false,
        }
    }

    pub fn set_camera_range(&mut self, near: f32, far: f32) {
        self.uniform.camera_near = near;
        self.uniform.camera_far = far;
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.uniform.time = seconds;
    }

    pub fn uniform(&self) -> &CloudUniform {
        &self.uniform
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Render the depth pass through `render`.
    ///
    /// Pending resizes are applied first. The surface and the hidden list are
    /// invisible while `render` runs and are restored on every exit path.
    pub fn render_depth_pass<S, E, F>(&mut self, scene: &mut S, render: F) -> std::result::Result<(), E>
    where
        S: SceneVisibility<Id = Id>,
        F: FnOnce(&mut S, &mut T) -> std::result::Result<(), E>,
    {
        self.apply_pending_resize();
        let ids = self.hidden.iter().copied().chain(self.surface);
        let mut scope = VisibilityScope::hide(scene, ids);
        let result = render(&mut *scope, &mut self.target);
        drop(scope);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[derive(Default)]
    struct FakeTarget {
        size: (u32, u32),
        resizes: u32,
    }

    impl DepthTarget for FakeTarget {
        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            self.resizes += 1;
        }

        fn size(&self) -> (u32, u32) {
            self.size
        }
    }

    #[derive(Default)]
    struct FakeScene {
        visible: HashMap<u32, bool>,
    }

    impl FakeScene {
        fn with(ids: &[(u32, bool)]) -> Self {
            Self {
                visible: ids.iter().copied().collect(),
            }
        }
    }

    impl SceneVisibility for FakeScene {
        type Id = u32;

        fn set_visible(&mut self, id: u32, visible: bool) -> Option<bool> {
            self.visible.get_mut(&id).map(|v| std::mem::replace(v, visible))
        }
    }

    fn compositor() -> DepthCompositor<FakeTarget, u32> {
        let target = FakeTarget { size: (640, 480), resizes: 0 };
        let mut c = DepthCompositor::new(target, &CloudConfig::default(), &DepthFadeConfig::default())
            .expect("valid defaults");
        c.set_surface(1);
        c.set_hidden([2, 3]);
        c
    }

    #[test]
    fn pass_hides_surface_and_list_then_restores() {
        let mut c = compositor();
        let mut scene = FakeScene::with(&[(1, true), (2, true), (3, false), (4, true)]);
        c.render_depth_pass(&mut scene, |s, _| {
            assert_eq!(s.visible[&1], false);
            assert_eq!(s.visible[&2], false);
            assert_eq!(s.visible[&3], false);
            assert_eq!(s.visible[&4], true);
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(scene.visible[&1], true);
        assert_eq!(scene.visible[&2], true);
        assert_eq!(scene.visible[&3], false);
        assert_eq!(scene.visible[&4], true);
    }

    #[test]
    fn pass_restores_on_error() {
        let mut c = compositor();
        let mut scene = FakeScene::with(&[(1, true), (2, true), (3, true)]);
        let result = c.render_depth_pass(&mut scene, |_, _| Err("device lost"));
        assert_eq!(result, Err("device lost"));
        assert!(scene.visible.values().all(|v| *v));
    }

    #[test]
    fn pass_restores_on_panic() {
        let mut c = compositor();
        let mut scene = FakeScene::with(&[(1, true), (2, true), (3, true)]);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = c.render_depth_pass(&mut scene, |_, _| -> std::result::Result<(), ()> {
                panic!("render blew up")
            });
        }));
        assert!(outcome.is_err());
        assert!(scene.visible.values().all(|v| *v));
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let mut c = compositor();
        c.hide_during_pass(99);
        let mut scene = FakeScene::with(&[(1, true)]);
        c.render_depth_pass(&mut scene, |s, _| {
            assert_eq!(s.visible[&1], false);
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(scene.visible.len(), 1);
        assert_eq!(scene.visible[&1], true);
    }

    #[test]
    fn resize_updates_target_and_resolution_together() {
        let mut c = compositor();
        let size = c.on_resize(1280, 720, 1.5);
        assert_eq!(size, (1920, 1080));
        assert_eq!(c.target().size(), (1920, 1080));
        assert_eq!(c.uniform().resolution, [1920.0, 1080.0]);
    }

    #[test]
    fn pending_resize_lands_before_the_render_closure() {
        let bus = ResizeBus::new();
        let mut c = compositor();
        c.subscribe(&bus);
        bus.publish(ViewportSize::new(300, 200, 2.0));
        bus.publish(ViewportSize::new(400, 300, 2.0));
        let mut scene = FakeScene::default();
        let resolution = c.uniform().resolution;
        assert_eq!(resolution, [640.0, 480.0]);
        c.render_depth_pass(&mut scene, |_, target| {
            assert_eq!(target.size(), (800, 600));
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(c.uniform().resolution, [800.0, 600.0]);
        assert_eq!(c.target().resizes, 1);
        assert!(!c.apply_pending_resize());
    }

    #[test]
    fn dropping_compositor_releases_subscription() {
        let bus = ResizeBus::new();
        {
            let mut c = compositor();
            c.subscribe(&bus);
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn camera_range_and_time_reach_the_uniform() {
        let mut c = compositor();
        c.set_camera_range(0.5, 3000.0);
        c.set_time(12.5);
        assert_eq!(c.uniform().camera_near, 0.5);
        assert_eq!(c.uniform().camera_far, 3000.0);
        assert_eq!(c.uniform().time, 12.5);
    }

    #[test]
    fn initial_resolution_matches_target() {
        let c = compositor();
        assert_eq!(c.uniform().resolution, [640.0, 480.0]);
    }
}
