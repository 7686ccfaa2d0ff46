//! Tree shading: wind sway on foliage vertices, two-texture leaf cutout and
//! the stylised lighting pipeline (cosine-gradient ambient, GGX highlight,
//! back-scatter).

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::math::{saturate, smoothstep};
use crate::sampler::NoiseSampler;

/// Vertex colour red above this marks foliage.
pub const FOLIAGE_MASK: f32 = 0.1;
pub const LEAF_CUTOUT: f32 = 0.9;
pub const TRUNK_CUTOUT: f32 = 0.99;
pub const WIND_NOISE_SCALE: f32 = 0.1;
pub const WIND_SCROLL: f32 = 0.01;
pub const WIND_AMPLITUDE: Vec3 = Vec3::new(2.0, 0.0, 2.0);
pub const TRUNK_TILING: f32 = 10.0;

const GRADIENT_PHASES: Vec4 = Vec4::new(0.34, 0.48, 0.27, 0.0);
const GRADIENT_AMPLITUDES: Vec4 = Vec4::new(4.02, 0.34, 0.65, 0.0);
const GRADIENT_FREQUENCIES: Vec4 = Vec4::new(0.0, 0.48, 0.08, 0.0);
const GRADIENT_OFFSETS: Vec4 = Vec4::new(0.21, 0.33, 0.06, -0.38);

const ALBEDO_SHADOW: Vec3 = Vec3::new(0.0399, 0.570, 0.164);
const ALBEDO_LIT: Vec3 = Vec3::new(0.483, 0.950, 0.171);
const ALBEDO_LERP: f32 = 0.7;
const SPECULAR_ROUGHNESS: f32 = 0.6;
const SPECULAR_INTENSITY: f32 = 0.9;
const COLOR_INTENSITY: f32 = 0.3;

#[inline]
pub fn is_foliage(vertex_color: Vec4) -> bool {
    vertex_color.x > FOLIAGE_MASK
}

/// Scale, yaw, translate. The yaw turns the same way as the row-vector
/// multiply in the tree vertex program.
pub fn instance_vertex(local: Vec3, scale: f32, rotation: f32, offset: Vec3) -> Vec3 {
    Quat::from_rotation_y(-rotation) * (local * scale) + offset
}

pub fn instance_normal(normal: Vec3, rotation: f32) -> Vec3 {
    Quat::from_rotation_y(-rotation) * normal
}

/// Wind displacement for a foliage vertex at `world` position.
pub fn wind_offset(world: Vec3, time: f32, noise: &dyn NoiseSampler) -> Vec3 {
    let uv = Vec2::new(world.x, world.z) * WIND_NOISE_SCALE + Vec2::splat(time * WIND_SCROLL);
    noise.sample(uv).x * WIND_AMPLITUDE
}

/// Full vertex stage: returns the world position of a tree vertex.
#[allow(clippy::too_many_arguments)]
pub fn tree_vertex(
    local: Vec3,
    vertex_color: Vec4,
    scale: f32,
    rotation: f32,
    offset: Vec3,
    model: Mat4,
    time: f32,
    noise: &dyn NoiseSampler,
) -> Vec3 {
    let mut pos = instance_vertex(local, scale, rotation, offset);
    if is_foliage(vertex_color) {
        let sway_at = model.transform_point3(pos);
        pos += wind_offset(sway_at, time, noise);
    }
    model.transform_point3(pos)
}

/// Leaf atlas crop.
#[inline]
pub fn leaf_uv(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x + 0.05, uv.y - 0.24) * 1.25
}

pub fn cos_gradient(x: f32, phase: Vec4, amplitude: Vec4, frequency: Vec4, offset: Vec4) -> Vec4 {
    let phase = phase * TAU;
    let x = x * TAU;
    let arg = Vec4::splat(x) * frequency + phase;
    offset + amplitude * 0.5 * Vec4::new(arg.x.cos(), arg.y.cos(), arg.z.cos(), arg.w.cos())
        + Vec4::splat(0.5)
}

/// GGX normal distribution with `a2 = roughness²`.
#[inline]
pub fn dggx(a2: f32, n_dot_h: f32) -> f32 {
    let d = (n_dot_h * a2 - n_dot_h) * n_dot_h + 1.0;
    a2 / (PI * d * d)
}

/// Textures bound to the tree program.
pub struct FoliageTextures<'a> {
    pub leaf_one: &'a dyn NoiseSampler,
    pub leaf_two: &'a dyn NoiseSampler,
    pub bark: &'a dyn NoiseSampler,
}

impl FoliageTextures<'_> {
    /// Leaf types outside the two known textures sample nothing and are cut.
    fn leaf(&self, leaf_type: f32, uv: Vec2) -> Vec4 {
        if leaf_type < 1.5 {
            self.leaf_one.sample(uv)
        } else if leaf_type < 2.5 {
            self.leaf_two.sample(uv)
        } else {
            Vec4::ZERO
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FoliageFragment {
    pub world_position: Vec3,
    pub normal: Vec3,
    pub vertex_color: Vec4,
    pub uv: Vec2,
    pub leaf_type: f32,
    pub light_pos: Vec3,
    pub eye: Vec3,
}

/// Fragment stage. `None` means the fragment is discarded.
pub fn shade_foliage(frag: &FoliageFragment, textures: &FoliageTextures<'_>) -> Option<Vec4> {
    let foliage = is_foliage(frag.vertex_color);
    let tex = if foliage {
        textures.leaf(frag.leaf_type, leaf_uv(frag.uv))
    } else {
        textures.bark.sample(frag.uv * TRUNK_TILING)
    };
    let cutout = if foliage { LEAF_CUTOUT } else { TRUNK_CUTOUT };
    if tex.w < cutout {
        return None;
    }

    let eye_dir = (frag.eye - frag.world_position).normalize_or_zero();
    let normal = frag.normal.normalize_or_zero();
    let light_dir = frag.light_pos.normalize_or_zero();
    let n_dot_l = light_dir.dot(normal).max(0.0);

    let ambient = cos_gradient(
        n_dot_l,
        GRADIENT_PHASES,
        GRADIENT_AMPLITUDES,
        GRADIENT_FREQUENCIES,
        GRADIENT_OFFSETS,
    )
    .truncate();
    let albedo = ALBEDO_SHADOW.lerp(ALBEDO_LIT, n_dot_l + ALBEDO_LERP);
    let diffuse = (ambient * albedo).lerp(albedo, n_dot_l);

    let half = (frag.light_pos + frag.eye).normalize_or_zero();
    let specular = dggx(SPECULAR_ROUGHNESS * SPECULAR_ROUGHNESS, normal.dot(half));
    let specular_color = if foliage {
        albedo * specular * SPECULAR_INTENSITY
    } else {
        Vec3::splat(specular * SPECULAR_INTENSITY)
    };

    let rgb = if foliage {
        let back_dir = (normal + frag.light_pos).normalize_or_zero();
        let back = saturate(eye_dir.dot(-back_dir));
        let back_intensity = smoothstep(0.8, 1.0, back) * 0.5;
        let back_sss = saturate(back * back_intensity);

        let base = (diffuse + albedo + specular_color) * COLOR_INTENSITY;
        let mut rgb = (base * 0.8).lerp(base, tex.x);
        let top = Vec3::Y.dot(normal) * 0.5 + 0.5;
        rgb *= smoothstep(0.1, 0.99, top);
        rgb + Vec3::splat(back_sss)
    } else {
        (tex.truncate() + specular_color) * COLOR_INTENSITY * 0.5
    };
    Some(rgb.extend(tex.w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ConstantSampler;

    const LEAF: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    const TRUNK: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

    fn fragment(color: Vec4, leaf_type: f32) -> FoliageFragment {
        FoliageFragment {
            world_position: Vec3::ZERO,
            normal: Vec3::Y,
            vertex_color: color,
            uv: Vec2::new(0.3, 0.6),
            leaf_type,
            light_pos: Vec3::new(0.0, 10.0, 0.0),
            eye: Vec3::new(0.0, 5.0, 5.0),
        }
    }

    #[test]
    fn yaw_follows_row_vector_convention() {
        let p = instance_vertex(Vec3::X, 1.0, std::f32::consts::FRAC_PI_2, Vec3::ZERO);
        assert!((p - Vec3::Z).length() < 1e-6);
        let p = instance_vertex(Vec3::new(1.0, 2.0, 0.0), 0.5, 0.0, Vec3::new(10.0, 0.0, 0.0));
        assert!((p - Vec3::new(10.5, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn normals_turn_with_the_instance_but_ignore_scale() {
        let yaw = 0.7;
        let n = instance_normal(Vec3::X, yaw);
        let p = instance_vertex(Vec3::X, 3.0, yaw, Vec3::ZERO);
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!((n - p / 3.0).length() < 1e-6);
        assert!((instance_normal(Vec3::Y, yaw) - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn wind_moves_only_foliage() {
        let noise = ConstantSampler(Vec4::splat(0.25));
        let trunk = tree_vertex(Vec3::ONE, TRUNK, 1.0, 0.0, Vec3::ZERO, Mat4::IDENTITY, 3.0, &noise);
        assert_eq!(trunk, Vec3::ONE);
        let leaf = tree_vertex(Vec3::ONE, LEAF, 1.0, 0.0, Vec3::ZERO, Mat4::IDENTITY, 3.0, &noise);
        assert!((leaf - Vec3::new(1.5, 1.0, 1.5)).length() < 1e-6);
    }

    #[test]
    fn leaf_below_cutout_is_discarded() {
        let thin = ConstantSampler(Vec4::new(1.0, 1.0, 1.0, 0.89));
        let solid = ConstantSampler(Vec4::ONE);
        let tex = FoliageTextures { leaf_one: &thin, leaf_two: &solid, bark: &solid };
        assert!(shade_foliage(&fragment(LEAF, 1.0), &tex).is_none());
        assert!(shade_foliage(&fragment(LEAF, 2.0), &tex).is_some());
        assert!(shade_foliage(&fragment(LEAF, 3.0), &tex).is_none());
    }

    #[test]
    fn trunk_uses_the_stricter_cutout() {
        let almost = ConstantSampler(Vec4::new(0.5, 0.4, 0.3, 0.98));
        let solid = ConstantSampler(Vec4::ONE);
        let tex = FoliageTextures { leaf_one: &solid, leaf_two: &solid, bark: &almost };
        assert!(shade_foliage(&fragment(TRUNK, 1.0), &tex).is_none());
        let tex = FoliageTextures { leaf_one: &almost, leaf_two: &almost, bark: &solid };
        assert!(shade_foliage(&fragment(LEAF, 1.0), &tex).is_some());
    }

    #[test]
    fn trunk_color_is_texture_plus_highlight() {
        let bark = ConstantSampler(Vec4::new(0.5, 0.4, 0.3, 1.0));
        let tex = FoliageTextures { leaf_one: &bark, leaf_two: &bark, bark: &bark };
        let frag = fragment(TRUNK, 1.0);
        let out = shade_foliage(&frag, &tex).unwrap();
        let half = (frag.light_pos + frag.eye).normalize();
        let spec = dggx(0.36, Vec3::Y.dot(half)) * 0.9;
        let expected = (Vec3::new(0.5, 0.4, 0.3) + Vec3::splat(spec)) * 0.15;
        assert!((out.truncate() - expected).length() < 1e-5);
        assert_eq!(out.w, 1.0);
    }

    #[test]
    fn ggx_peaks_at_aligned_half_vector() {
        let a2 = 0.36;
        assert!((dggx(a2, 1.0) - 1.0 / (PI * a2)).abs() < 1e-5);
        assert!(dggx(a2, 1.0) > dggx(a2, 0.7));
    }

    #[test]
    fn gradient_matches_closed_form() {
        let g = cos_gradient(0.0, GRADIENT_PHASES, GRADIENT_AMPLITUDES, GRADIENT_FREQUENCIES, GRADIENT_OFFSETS);
        let r = 0.21 + 4.02 * 0.5 * (0.34 * TAU).cos() + 0.5;
        assert!((g.x - r).abs() < 1e-5);
    }

    #[test]
    fn leaf_crop() {
        assert!((leaf_uv(Vec2::new(0.0, 0.24)) - Vec2::new(0.0625, 0.0)).length() < 1e-6);
    }

    #[test]
    fn lit_leaf_is_finite_and_opaque() {
        let solid = ConstantSampler(Vec4::ONE);
        let tex = FoliageTextures { leaf_one: &solid, leaf_two: &solid, bark: &solid };
        let out = shade_foliage(&fragment(LEAF, 2.0), &tex).unwrap();
        assert!(out.is_finite());
        assert_eq!(out.w, 1.0);
        assert!(out.x > 0.0 && out.y > 0.0);
    }
}
