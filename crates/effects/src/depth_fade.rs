//! Soft intersection fade between a translucent surface and the opaque
//! geometry behind it, evaluated per fragment.
//!
//! Linear depths here are signed view-space Z (negative in front of the
//! camera), which is what the perspective inverse yields. With that
//! convention `fragment - scene` is the distance from the surface to the
//! geometry behind it.

use crate::error::{positive, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthFadeConfig {
    /// Depth distance over which the surface fades in.
    pub depth_scale: f32,
    /// Curve exponent: higher values keep the fade tighter to the contact line.
    pub depth_falloff: f32,
}

impl Default for DepthFadeConfig {
    fn default() -> Self {
        Self {
            depth_scale: 25.0,
            depth_falloff: 3.0,
        }
    }
}

impl DepthFadeConfig {
    pub fn validate(&self) -> Result<()> {
        positive("depth scale", self.depth_scale)?;
        positive("depth falloff", self.depth_falloff)?;
        Ok(())
    }
}

/// Invert a [0, 1] perspective depth-buffer value to view-space Z.
#[inline]
pub fn perspective_depth_to_view_z(depth: f32, near: f32, far: f32) -> f32 {
    (near * far) / ((far - near) * depth - far)
}

/// View-space Z to a linear [0, 1] depth (0 at near, 1 at far).
#[inline]
pub fn view_z_to_orthographic_depth(view_z: f32, near: f32, far: f32) -> f32 {
    (view_z + near) / (near - far)
}

/// `saturate(1 - (fragment - scene) / scale) ^ falloff`. 1 means fully faded.
#[inline]
pub fn depth_fade(fragment_view_z: f32, scene_view_z: f32, depth_scale: f32, depth_falloff: f32) -> f32 {
    (1.0 - (fragment_view_z - scene_view_z) / depth_scale)
        .clamp(0.0, 1.0)
        .powf(depth_falloff)
}

/// True where the mask target holds geometry (anything but the cleared depth).
#[inline]
pub fn mask_covers(mask_raw_depth: f32, near: f32, far: f32) -> bool {
    mask_raw_depth < 1.0
        && view_z_to_orthographic_depth(perspective_depth_to_view_z(mask_raw_depth, near, far), near, far) < 1.0
}

/// Final surface alpha: faded where the mask has geometry, opaque elsewhere.
#[inline]
pub fn composite_alpha(mask_raw_depth: f32, fade: f32, near: f32, far: f32) -> f32 {
    if mask_covers(mask_raw_depth, near, far) {
        1.0 - fade
    } else {
        1.0
    }
}

/// Whole per-fragment pipeline from raw depth samples.
pub fn fragment_alpha(
    fragment_depth: f32,
    scene_depth: f32,
    mask_depth: f32,
    near: f32,
    far: f32,
    config: &DepthFadeConfig,
) -> f32 {
    let fragment_z = perspective_depth_to_view_z(fragment_depth, near, far);
    let scene_z = perspective_depth_to_view_z(scene_depth, near, far);
    let fade = depth_fade(fragment_z, scene_z, config.depth_scale, config.depth_falloff);
    composite_alpha(mask_depth, fade, near, far)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec4};

    const NEAR: f32 = 0.1;
    const FAR: f32 = 1000.0;

    fn project_depth(view_z: f32) -> f32 {
        let proj = Mat4::perspective_rh(1.0, 1.5, NEAR, FAR);
        let clip = proj * Vec4::new(0.0, 0.0, view_z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn linearization_inverts_the_projection() {
        for z in [-0.5_f32, -3.0, -25.0, -100.0] {
            let d = project_depth(z);
            let back = perspective_depth_to_view_z(d, NEAR, FAR);
            assert!((back - z).abs() / z.abs() < 1e-3, "{z} -> {d} -> {back}");
        }
    }

    #[test]
    fn cleared_depth_is_far_plane() {
        let z = perspective_depth_to_view_z(1.0, NEAR, FAR);
        assert!((z + FAR).abs() / FAR < 1e-3, "{z}");
        assert!((view_z_to_orthographic_depth(-NEAR, NEAR, FAR)).abs() < 1e-6);
    }

    #[test]
    fn equal_depths_fade_completely() {
        assert_eq!(depth_fade(-30.0, -30.0, 25.0, 3.0), 1.0);
    }

    #[test]
    fn delta_beyond_scale_does_not_fade() {
        assert_eq!(depth_fade(-30.0, -55.0, 25.0, 3.0), 0.0);
        assert_eq!(depth_fade(-30.0, -90.0, 25.0, 3.0), 0.0);
    }

    #[test]
    fn falloff_shapes_the_curve() {
        let half = depth_fade(-10.0, -22.5, 25.0, 3.0);
        assert!((half - 0.125).abs() < 1e-6);
        let linear = depth_fade(-10.0, -22.5, 25.0, 1.0);
        assert!((linear - 0.5).abs() < 1e-6);
    }

    #[test]
    fn cleared_mask_forces_opaque() {
        for fade in [0.0, 0.3, 1.0] {
            assert_eq!(composite_alpha(1.0, fade, NEAR, FAR), 1.0);
        }
        assert_eq!(composite_alpha(0.5, 1.0, NEAR, FAR), 0.0);
        assert!((composite_alpha(0.5, 0.25, NEAR, FAR) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn fragment_pipeline_end_to_end() {
        let cfg = DepthFadeConfig::default();
        let surface = project_depth(-100.0);
        let touching = project_depth(-100.0);
        let far_behind = project_depth(-200.0);
        let covered = project_depth(-50.0);
        assert!(fragment_alpha(surface, touching, covered, NEAR, FAR, &cfg) < 1e-3);
        assert!((fragment_alpha(surface, far_behind, covered, NEAR, FAR, &cfg) - 1.0).abs() < 1e-6);
        assert_eq!(fragment_alpha(surface, touching, 1.0, NEAR, FAR, &cfg), 1.0);
    }

    #[test]
    fn config_rejects_zero_scale() {
        let cfg = DepthFadeConfig { depth_scale: 0.0, ..Default::default() };
        assert!(cfg.validate().is_err());
        assert!(DepthFadeConfig::default().validate().is_ok());
    }
}
