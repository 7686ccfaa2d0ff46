//! Texture sampling seam shared by the CPU reference of the shader math.

use glam::{Vec2, Vec4};
use procgen::TextureData;

/// A repeat-wrapped, linearly filtered 2D texture.
pub trait NoiseSampler {
    fn sample(&self, uv: Vec2) -> Vec4;
}

impl NoiseSampler for TextureData {
    fn sample(&self, uv: Vec2) -> Vec4 {
        self.sample_bilinear(uv)
    }
}

/// Same value everywhere. Handy in tests.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSampler(pub Vec4);

impl NoiseSampler for ConstantSampler {
    fn sample(&self, _uv: Vec2) -> Vec4 {
        self.0
    }
}
