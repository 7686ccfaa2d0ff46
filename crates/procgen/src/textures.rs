//! Procedural texture generation for the cloud sea, fog and trees.
//! Every texture is tileable so it can be sampled with repeat wrapping.

use glam::{Vec2, Vec4};
use noise::{NoiseFn, Perlin};
use rand::prelude::*;
use std::f64::consts::TAU;

/// RGBA pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: (r.clamp(0.0, 1.0) * 255.0).round() as u8,
            g: (g.clamp(0.0, 1.0) * 255.0).round() as u8,
            b: (b.clamp(0.0, 1.0) * 255.0).round() as u8,
            a: (a.clamp(0.0, 1.0) * 255.0).round() as u8,
        }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Normalized channels in [0, 1].
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(self.r as f32, self.g as f32, self.b as f32, self.a as f32) / 255.0
    }
}

/// Generated (or decoded) texture data, RGBA8.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

impl TextureData {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::new(0, 0, 0, 255); (width * height) as usize],
        }
    }

    /// Wrap raw RGBA8 bytes (as decoded by an image loader).
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != (width as usize) * (height as usize) * 4 || width == 0 || height == 0 {
            return None;
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect();
        Some(Self { width, height, pixels })
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = pixel;
        }
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            Pixel::new(0, 0, 0, 255)
        }
    }

    /// Nearest sample with repeat wrapping.
    pub fn sample(&self, u: f32, v: f32) -> Pixel {
        let x = (u.rem_euclid(1.0) * self.width as f32) as u32 % self.width;
        let y = (v.rem_euclid(1.0) * self.height as f32) as u32 % self.height;
        self.get_pixel(x, y)
    }

    /// Bilinear sample with repeat wrapping, texel centers at half offsets
    /// (matches a linear-filtered GPU sampler).
    pub fn sample_bilinear(&self, uv: Vec2) -> Vec4 {
        let w = self.width as f32;
        let h = self.height as f32;
        let x = uv.x.rem_euclid(1.0) * w - 0.5;
        let y = uv.y.rem_euclid(1.0) * h - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let wrap = |v: f32, n: u32| (v as i64).rem_euclid(n as i64) as u32;
        let (ix0, ix1) = (wrap(x0, self.width), wrap(x0 + 1.0, self.width));
        let (iy0, iy1) = (wrap(y0, self.height), wrap(y0 + 1.0, self.height));
        let a = self.get_pixel(ix0, iy0).to_vec4();
        let b = self.get_pixel(ix1, iy0).to_vec4();
        let c = self.get_pixel(ix0, iy1).to_vec4();
        let d = self.get_pixel(ix1, iy1).to_vec4();
        a.lerp(b, fx).lerp(c.lerp(d, fx), fy)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel.to_bytes());
        }
        bytes
    }
}

/// Procedural texture generator
pub struct TextureGenerator {
    perlin: Perlin,
    rng: StdRng,
}

impl TextureGenerator {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            perlin: Perlin::new(rng.gen()),
            rng,
        }
    }

    /// Detail noise: four decorrelated tileable fbm fields in RGBA.
    pub fn generate_detail_noise(&mut self, size: u32, frequency: f64) -> TextureData {
        let mut texture = TextureData::new(size, size);
        let offsets: [f64; 4] = [0.0, 17.3, 41.9, 73.1];
        for y in 0..size {
            for x in 0..size {
                let u = x as f64 / size as f64;
                let v = y as f64 / size as f64;
                let c: Vec<f32> = offsets
                    .iter()
                    .map(|o| self.tileable_fbm(u, v, frequency, *o, 5) as f32)
                    .collect();
                texture.set_pixel(x, y, Pixel::from_rgba(c[0], c[1], c[2], c[3]));
            }
        }
        log::debug!("Generated {}x{} detail noise", size, size);
        texture
    }

    /// Flow map: RG = direction encoded as `dir * 0.5 + 0.5`, A = time offset noise.
    pub fn generate_flow_map(&mut self, size: u32, frequency: f64) -> TextureData {
        let mut texture = TextureData::new(size, size);
        let eps = 1.0 / size as f64;
        for y in 0..size {
            for x in 0..size {
                let u = x as f64 / size as f64;
                let v = y as f64 / size as f64;
                // Curl of a scalar potential gives a divergence-free swirl.
                let dpdu = self.tileable_fbm(u + eps, v, frequency, 5.0, 3)
                    - self.tileable_fbm(u - eps, v, frequency, 5.0, 3);
                let dpdv = self.tileable_fbm(u, v + eps, frequency, 5.0, 3)
                    - self.tileable_fbm(u, v - eps, frequency, 5.0, 3);
                let dir = Vec2::new(dpdv as f32, -dpdu as f32).normalize_or_zero();
                let offset = self.tileable_fbm(u, v, frequency * 2.0, 91.0, 3) as f32;
                texture.set_pixel(
                    x,
                    y,
                    Pixel::from_rgba(dir.x * 0.5 + 0.5, dir.y * 0.5 + 0.5, 0.0, offset),
                );
            }
        }
        texture
    }

    /// Soft smoke puff in R (and alpha), fading to zero at the quad edge.
    pub fn generate_smoke(&mut self, size: u32) -> TextureData {
        let mut texture = TextureData::new(size, size);
        let phase = self.rng.gen::<f64>() * 100.0;
        for y in 0..size {
            for x in 0..size {
                let u = x as f64 / size as f64;
                let v = y as f64 / size as f64;
                let d = ((u - 0.5).powi(2) + (v - 0.5).powi(2)).sqrt() * 2.0;
                let radial = smooth_step(1.0, 0.2, d);
                let wisps = self.tileable_fbm(u, v, 4.0, phase, 5);
                let s = (radial * (0.4 + wisps * 0.9)).clamp(0.0, 1.0) as f32;
                texture.set_pixel(x, y, Pixel::from_rgba(s, s, s, s));
            }
        }
        texture
    }

    /// Leaf card: clustered blobs with hard alpha for cutout rendering.
    pub fn generate_leaves(&mut self, size: u32, density: f64) -> TextureData {
        let mut texture = TextureData::new(size, size);
        let phase = self.rng.gen::<f64>() * 100.0;
        for y in 0..size {
            for x in 0..size {
                let u = x as f64 / size as f64;
                let v = y as f64 / size as f64;
                let n = self.tileable_fbm(u, v, density, phase, 4);
                let alpha = if n > 0.5 { 1.0 } else { 0.0 };
                let shade = (0.55 + (n - 0.5) * 1.5).clamp(0.0, 1.0) as f32;
                texture.set_pixel(x, y, Pixel::from_rgba(shade, shade, shade, alpha));
            }
        }
        texture
    }

    /// Bark: vertical streaks, fully opaque.
    pub fn generate_bark(&mut self, size: u32) -> TextureData {
        let mut texture = TextureData::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let u = x as f64 / size as f64;
                let v = y as f64 / size as f64;
                let streak = self.tileable_fbm(u * 1.0, v * 0.25, 8.0, 23.0, 4) as f32;
                let c = 0.25 + streak * 0.35;
                texture.set_pixel(x, y, Pixel::from_rgba(c * 1.2, c, c * 0.7, 1.0));
            }
        }
        texture
    }

    /// Fractal noise in [0, 1] that tiles over the unit square by sampling a
    /// 4D torus.
    fn tileable_fbm(&self, u: f64, v: f64, frequency: f64, offset: f64, octaves: u32) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 0.5;
        let mut radius = frequency / TAU;
        let mut norm = 0.0;
        for _ in 0..octaves {
            let p = [
                (u * TAU).cos() * radius + offset,
                (u * TAU).sin() * radius + offset,
                (v * TAU).cos() * radius - offset,
                (v * TAU).sin() * radius - offset,
            ];
            value += amplitude * (self.perlin.get(p) * 0.5 + 0.5);
            norm += amplitude;
            amplitude *= 0.5;
            radius *= 2.0;
        }
        (value / norm).clamp(0.0, 1.0)
    }
}

fn smooth_step(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_noise_is_deterministic_per_seed() {
        let a = TextureGenerator::new(7).generate_detail_noise(16, 4.0);
        let b = TextureGenerator::new(7).generate_detail_noise(16, 4.0);
        assert_eq!(a.pixels, b.pixels);
    }

    #[test]
    fn bilinear_sample_wraps() {
        let mut t = TextureData::new(2, 2);
        t.set_pixel(0, 0, Pixel::new(255, 0, 0, 255));
        t.set_pixel(1, 0, Pixel::new(255, 0, 0, 255));
        t.set_pixel(0, 1, Pixel::new(255, 0, 0, 255));
        t.set_pixel(1, 1, Pixel::new(255, 0, 0, 255));
        let s = t.sample_bilinear(Vec2::new(-3.25, 7.75));
        assert!((s.x - 1.0).abs() < 1e-6);
        assert!(s.y.abs() < 1e-6);
    }

    #[test]
    fn bilinear_sample_at_texel_center_is_exact() {
        let mut t = TextureData::new(4, 1);
        t.set_pixel(2, 0, Pixel::new(200, 0, 0, 255));
        let s = t.sample_bilinear(Vec2::new(2.5 / 4.0, 0.5));
        assert!((s.x - 200.0 / 255.0).abs() < 1e-5);
    }

    #[test]
    fn flow_map_encodes_unit_directions() {
        let t = TextureGenerator::new(3).generate_flow_map(8, 2.0);
        for p in &t.pixels {
            let d = Vec2::new(p.r as f32 / 255.0 * 2.0 - 1.0, p.g as f32 / 255.0 * 2.0 - 1.0);
            let len = d.length();
            assert!(len < 1.02, "direction too long: {len}");
        }
    }

    #[test]
    fn leaves_alpha_is_binary() {
        let t = TextureGenerator::new(11).generate_leaves(16, 6.0);
        assert!(t.pixels.iter().all(|p| p.a == 0 || p.a == 255));
    }

    #[test]
    fn from_rgba8_rejects_wrong_length() {
        assert!(TextureData::from_rgba8(2, 2, &[0; 15]).is_none());
        assert!(TextureData::from_rgba8(1, 1, &[1, 2, 3, 4]).is_some());
    }
}
