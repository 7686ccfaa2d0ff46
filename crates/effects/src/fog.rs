//! Drifting ground fog: a fixed pool of billboard wisps that fade in quickly,
//! linger while fading out slowly, then respawn somewhere else on the disk.

use std::f32::consts::TAU;

use glam::{Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{positive, EffectError, Result};
use crate::instance_buffer::{FogChannels, InstancedParticleBuffer};

/// Side length of the billboard quad in local units.
pub const FOG_QUAD_SIZE: f32 = 100.0;
/// Horizontal and vertical distance over which wisps fade out near the origin.
pub const FOG_CUT_OUT: f32 = 200.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FogConfig {
    /// Number of wisps in the pool.
    pub capacity: usize,
    /// Radius of the spawn disk.
    pub radius: f32,
    /// Spawn height band (local space, below the group offset).
    pub height_min: f32,
    pub height_max: f32,
    /// Opacity gained per tick while fading in.
    pub rise_step: f32,
    /// Opacity lost per tick while fading out.
    pub fall_step: f32,
    /// Texture rotation per tick, sign picked at respawn.
    pub rotation_step: f32,
    /// Vertical offset of the whole fog group.
    pub group_offset_y: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            capacity: 150,
            radius: 1000.0,
            height_min: 20.0,
            height_max: 40.0,
            rise_step: 0.01,
            fall_step: 0.001,
            rotation_step: 0.005,
            group_offset_y: -65.0,
        }
    }
}

impl FogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(EffectError::EmptyPool);
        }
        positive("fog radius", self.radius)?;
        positive("fog rotation step", self.rotation_step)?;
        if !(self.height_min.is_finite() && self.height_max.is_finite())
            || self.height_max < self.height_min
        {
            return Err(EffectError::EmptyBand {
                min: self.height_min,
                max: self.height_max,
            });
        }
        if !(self.fall_step > 0.0 && self.fall_step < self.rise_step && self.rise_step.is_finite()) {
            return Err(EffectError::FadeSteps {
                rise: self.rise_step,
                fall: self.fall_step,
            });
        }
        Ok(())
    }
}

/// CPU-only lifecycle state of one wisp. The GPU-visible parts live in the
/// instance buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogSlot {
    pub velocity: Vec3,
    pub max_opacity: f32,
    /// False while rising toward `max_opacity`, true until the slot respawns.
    pub fading_out: bool,
    /// Coin flip: > 0.5 rotates the texture counter-clockwise.
    pub rotate_dir: f32,
    /// How many times this slot has been respawned.
    pub respawns: u32,
}

impl Default for FogSlot {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            max_opacity: 1.0,
            fading_out: false,
            rotate_dir: 0.0,
            respawns: 0,
        }
    }
}

/// Owns the fog instance buffer and advances it once per frame.
pub struct FogSimulator<R: Rng = StdRng> {
    config: FogConfig,
    rng: R,
    slots: Vec<FogSlot>,
    buffer: InstancedParticleBuffer<FogChannels>,
}

impl FogSimulator<StdRng> {
    /// Deterministic simulator for a given seed.
    pub fn from_seed(config: FogConfig, seed: u64) -> Result<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> FogSimulator<R> {
    /// Every slot starts at zero opacity, so the first tick respawns the whole pool.
    pub fn new(config: FogConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        log::info!(
            "Fog pool: {} wisps, spawn radius {}, band {}..{}",
            capacity,
            config.radius,
            config.height_min,
            config.height_max
        );
        Ok(Self {
            rng,
            slots: vec![FogSlot::default(); capacity],
            buffer: InstancedParticleBuffer::new(capacity),
            config,
        })
    }

    pub fn config(&self) -> &FogConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> &FogSlot {
        &self.slots[index]
    }

    pub fn opacity(&self, index: usize) -> f32 {
        self.buffer.layout().opacity.get(index)
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from(self.buffer.layout().positions.get(index))
    }

    pub fn texture_rotation(&self, index: usize) -> f32 {
        self.buffer.layout().texture_rotation.get(index)
    }

    pub fn buffer(&self) -> &InstancedParticleBuffer<FogChannels> {
        &self.buffer
    }

    /// Upload side: drains the dirty channels.
    pub fn buffer_mut(&mut self) -> &mut InstancedParticleBuffer<FogChannels> {
        &mut self.buffer
    }

    /// Advance every slot once, in index order. Slots are independent of each other.
    pub fn tick(&mut self) {
        let Self {
            config,
            rng,
            slots,
            buffer,
        } = self;
        let ch = buffer.layout_mut();

        for (i, slot) in slots.iter_mut().enumerate() {
            if ch.opacity.get(i) <= 0.0 {
                respawn(config, rng, slot, ch, i);
            }

            let mut opacity = ch.opacity.get(i);
            if opacity >= slot.max_opacity {
                slot.fading_out = true;
            }
            if slot.fading_out {
                opacity -= config.fall_step;
            } else {
                opacity += config.rise_step;
            }
            ch.opacity.set(i, opacity);

            let p = Vec3::from(ch.positions.get(i)) + slot.velocity;
            ch.positions.set(i, p.to_array());

            let step = if slot.rotate_dir > 0.5 {
                config.rotation_step
            } else {
                -config.rotation_step
            };
            ch.texture_rotation.set(i, ch.texture_rotation.get(i) + step);
        }

        ch.scales.mark_dirty();
        ch.positions.mark_dirty();
        ch.opacity.mark_dirty();
        ch.texture_rotation.mark_dirty();
    }
}

fn respawn<R: Rng>(config: &FogConfig, rng: &mut R, slot: &mut FogSlot, ch: &mut FogChannels, i: usize) {
    ch.scales.set(
        i,
        [
            1.0 + rng.gen::<f32>() * 3.0,
            1.0 + rng.gen::<f32>() * 1.0,
            1.0 + rng.gen::<f32>() * 3.0,
        ],
    );

    // Uniform over the disk area.
    let r = config.radius * rng.gen::<f32>().sqrt();
    let theta = rng.gen::<f32>() * TAU;
    let y = config.height_min + rng.gen::<f32>() * (config.height_max - config.height_min);
    ch.positions.set(i, [r * theta.cos(), y, r * theta.sin()]);

    // Both horizontal components share the same bias, so every wisp drifts
    // toward -X/-Z. Kept as authored.
    let speed = rng.gen::<f32>();
    slot.velocity = Vec3::new(-0.1 - speed, rng.gen::<f32>() * 0.01, -0.1 - speed);
    slot.fading_out = false;
    slot.max_opacity = 0.5 + rng.gen::<f32>() * 0.5;
    slot.rotate_dir = rng.gen::<f32>();
    slot.respawns += 1;
    ch.texture_rotation.set(i, rng.gen::<f32>() * TAU);
    ch.opacity.set(i, 0.0);
}

/// `rotateVecQuat` of the billboard vertex stage: local quad corner rotated to
/// face the camera, scaled per instance, moved to the instance anchor.
pub fn billboard_vertex(local: Vec3, camera_rotation: Quat, scale: Vec3, anchor: Vec3) -> Vec3 {
    let q = camera_rotation.xyz();
    let rotated = local + 2.0 * q.cross(q.cross(local) + camera_rotation.w * local);
    rotated * scale + anchor
}

/// Rotate a quad UV about its center.
pub fn rotate_uv(uv: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    let mid = 0.5;
    Vec2::new(
        c * (uv.x - mid) - s * (uv.y - mid) + mid,
        c * (uv.y - mid) + s * (uv.x - mid) + mid,
    )
}

/// Fragment alpha: instance opacity times the smoke mask, faded out close to
/// the origin horizontally and far below it vertically.
pub fn fragment_alpha(opacity: f32, smoke_r: f32, world_position: Vec3) -> f32 {
    let distance_fade =
        (Vec2::new(world_position.x, world_position.z).length() / FOG_CUT_OUT).clamp(0.0, 1.0);
    let height_fade = ((world_position.y + FOG_CUT_OUT) / FOG_CUT_OUT).clamp(0.0, 1.0);
    opacity * smoke_r * height_fade * distance_fade
}
