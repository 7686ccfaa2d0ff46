//! Cloud sea surface: flow-map driven vertex displacement and the
//! valley/peak color ramp, mirrored on the CPU for testing and tooling.

use std::f32::consts::FRAC_PI_2;

use engine_core::Transform;
use glam::{Quat, Vec2, Vec3};

use crate::error::{positive, Result};
use crate::sampler::NoiseSampler;

#[derive(Debug, Clone, PartialEq)]
pub struct CloudConfig {
    /// Lateral UV drift applied once per flow loop.
    pub jump: Vec2,
    pub tiling: f32,
    /// Flow loops per second.
    pub speed: f32,
    pub flow_strength: f32,
    pub flow_offset: f32,
    /// World units to flow-map UV.
    pub noise_scale: f32,
    /// Detail noise scroll per second.
    pub detail_scroll: f32,
    pub base_noise_scale: f32,
    pub base_noise_speed: f32,
    pub base_noise_strength: f32,
    /// Displacement along the surface normal for a noise value of 1.
    pub noise_height: f32,
    /// Side length of the square surface.
    pub plane_size: f32,
    /// Grid segments per side.
    pub subdivisions: u32,
    /// Height of the surface in world space.
    pub surface_y: f32,
    pub valley_color: Vec3,
    pub peak_color: Vec3,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            jump: Vec2::new(0.24, 0.2),
            tiling: 1.0,
            speed: 0.15,
            flow_strength: 0.1,
            flow_offset: 0.0,
            noise_scale: 0.002,
            detail_scroll: 0.03,
            base_noise_scale: 0.00045,
            base_noise_speed: 0.00045,
            base_noise_strength: 1.1,
            noise_height: 20.0,
            plane_size: 2500.0,
            subdivisions: 512,
            surface_y: -65.0,
            valley_color: Vec3::new(0.310, 0.585, 0.970),
            peak_color: Vec3::ONE,
        }
    }
}

impl CloudConfig {
    pub fn validate(&self) -> Result<()> {
        positive("cloud plane size", self.plane_size)?;
        positive("cloud tiling", self.tiling)?;
        positive("cloud base noise strength", self.base_noise_strength)?;
        if self.subdivisions == 0 {
            return Err(crate::EffectError::NonPositive {
                name: "cloud subdivisions",
                value: 0.0,
            });
        }
        Ok(())
    }

    /// The surface is authored in the XY plane and laid flat.
    pub fn surface_transform(&self) -> Transform {
        Transform::from_position_rotation(
            Vec3::new(0.0, self.surface_y, 0.0),
            Quat::from_rotation_x(-FRAC_PI_2),
        )
    }
}

/// GLSL-style `fract` (always non-negative).
#[inline]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// One phase of the two-phase flow map: advected UV in `xy`, blend weight in `z`.
pub fn flow_uvw(
    uv: Vec2,
    flow_vector: Vec2,
    jump: Vec2,
    flow_offset: f32,
    tiling: f32,
    time: f32,
    flow_b: bool,
) -> Vec3 {
    let phase_offset = if flow_b { 0.5 } else { 0.0 };
    let progress = fract(time + phase_offset);
    let mut xy = uv - flow_vector * (progress + flow_offset);
    xy *= tiling;
    xy += Vec2::splat(phase_offset);
    xy += (time - progress) * jump;
    let w = 1.0 - (1.0 - 2.0 * progress).abs();
    xy.extend(w)
}

/// Combined displacement noise at a world XZ position.
pub fn cloud_noise(
    world_xz: Vec2,
    time: f32,
    config: &CloudConfig,
    flow_texture: &impl NoiseSampler,
    noise_texture: &impl NoiseSampler,
) -> f32 {
    let pos_uv = world_xz * config.noise_scale;
    let flow = flow_texture.sample(pos_uv);
    let flow_vector = (Vec2::new(flow.x, flow.y) * 2.0 - Vec2::ONE) * config.flow_strength;
    let flow_time = time * config.speed + flow.w;

    let a = flow_uvw(pos_uv, flow_vector, config.jump, config.flow_offset, config.tiling, flow_time, false);
    let b = flow_uvw(pos_uv, flow_vector, config.jump, config.flow_offset, config.tiling, flow_time, true);

    let scroll = Vec2::splat(time * config.detail_scroll);
    let n1 = noise_texture.sample(a.truncate() + scroll).x * a.z;
    let n2 = noise_texture.sample(b.truncate() + scroll).x * b.z;

    let base_uv = world_xz * config.base_noise_scale + Vec2::splat(time * config.base_noise_speed);
    let base = noise_texture.sample(base_uv).x * config.base_noise_strength;

    n1 + n2 + base / (config.base_noise_strength + 1.0)
}

/// Push a local-space vertex along the surface normal (+Z before the flat rotation).
#[inline]
pub fn displace(local: Vec3, noise: f32, noise_height: f32) -> Vec3 {
    local + Vec3::Z * noise * noise_height
}

/// Valley color washes out toward the rim; noise blends valleys into peaks.
pub fn cloud_color(world_xz: Vec2, noise: f32, config: &CloudConfig) -> Vec3 {
    let half_width = config.plane_size * 0.5;
    let distance_lerp = (world_xz.length() / half_width).clamp(0.0, 1.0);
    let valley = config.valley_color.lerp(Vec3::ONE, distance_lerp);
    let peak = config.peak_color.lerp(Vec3::ONE, distance_lerp);
    valley.lerp(peak, noise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ConstantSampler;
    use glam::Vec4;
    use procgen::TextureGenerator;

    #[test]
    fn phase_weights_always_sum_to_one() {
        for i in 0..200 {
            let t = i as f32 * 0.037 - 3.0;
            let a = flow_uvw(Vec2::ZERO, Vec2::ZERO, Vec2::ZERO, 0.0, 1.0, t, false);
            let b = flow_uvw(Vec2::ZERO, Vec2::ZERO, Vec2::ZERO, 0.0, 1.0, t, true);
            assert!((a.z + b.z - 1.0).abs() < 1e-4, "t={t}: {} + {}", a.z, b.z);
        }
    }

    #[test]
    fn phase_is_invisible_at_its_reset() {
        let a = flow_uvw(Vec2::ZERO, Vec2::ONE, Vec2::ZERO, 0.0, 1.0, 2.0, false);
        assert_eq!(a.z, 0.0);
        let b = flow_uvw(Vec2::ZERO, Vec2::ONE, Vec2::ZERO, 0.0, 1.0, 2.0, true);
        assert_eq!(b.z, 1.0);
    }

    #[test]
    fn jump_accumulates_per_completed_loop() {
        let jump = Vec2::new(0.24, 0.2);
        let a = flow_uvw(Vec2::ZERO, Vec2::ZERO, jump, 0.0, 1.0, 3.25, false);
        assert!((a.truncate() - jump * 3.0).length() < 1e-5);
    }

    #[test]
    fn flow_advects_against_the_vector() {
        let a = flow_uvw(Vec2::new(0.5, 0.5), Vec2::new(0.1, 0.0), Vec2::ZERO, 0.0, 1.0, 0.5, false);
        assert!((a.x - 0.45).abs() < 1e-6);
        assert!((a.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn constant_textures_give_closed_form_noise() {
        let cfg = CloudConfig::default();
        let flow = ConstantSampler(Vec4::new(0.5, 0.5, 0.0, 0.0));
        let noise = ConstantSampler(Vec4::splat(0.4));
        let n = cloud_noise(Vec2::new(120.0, -40.0), 7.3, &cfg, &flow, &noise);
        let expected = 0.4 + 0.4 * 1.1 / 2.1;
        assert!((n - expected).abs() < 1e-4, "{n} vs {expected}");
    }

    #[test]
    fn generated_textures_keep_noise_bounded() {
        let cfg = CloudConfig::default();
        let mut gen = TextureGenerator::new(21);
        let flow = gen.generate_flow_map(32, 3.0);
        let detail = gen.generate_detail_noise(32, 4.0);
        for i in 0..50 {
            let p = Vec2::new(i as f32 * 37.0 - 900.0, i as f32 * -11.0 + 300.0);
            let n = cloud_noise(p, i as f32 * 0.7, &cfg, &flow, &detail);
            assert!((0.0..=1.0 + 1.1 / 2.1 + 1e-4).contains(&n));
        }
    }

    #[test]
    fn displacement_is_along_local_normal() {
        let p = displace(Vec3::new(3.0, 4.0, 0.0), 0.5, 20.0);
        assert_eq!(p, Vec3::new(3.0, 4.0, 10.0));
        let up = CloudConfig::default().surface_transform().rotation * Vec3::Z;
        assert!((up - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn color_ramp_ends() {
        let cfg = CloudConfig::default();
        assert!((cloud_color(Vec2::ZERO, 0.0, &cfg) - cfg.valley_color).length() < 1e-6);
        assert!((cloud_color(Vec2::ZERO, 1.0, &cfg) - Vec3::ONE).length() < 1e-6);
        assert!((cloud_color(Vec2::new(5000.0, 0.0), 0.0, &cfg) - Vec3::ONE).length() < 1e-6);
    }
}
