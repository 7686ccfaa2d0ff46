//! Static instanced trees. The attribute set is written once at construction
//! and never mutated afterwards; there is no per-frame tick.

use engine_core::Transform;
use glam::{Mat4, Vec3};

use crate::error::{EffectError, Result};
use crate::instance_buffer::{ChannelId, InstancedParticleBuffer, TreeChannels};

/// Which foliage texture a tree samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    One,
    Two,
}

impl LeafType {
    /// Value stored in the `leafType` instance attribute.
    pub fn as_attribute(&self) -> f32 {
        match self {
            LeafType::One => 1.0,
            LeafType::Two => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeSpec {
    pub position: Vec3,
    pub scale: f32,
    /// Yaw attribute as consumed by the foliage vertex stage.
    pub rotation: f32,
    pub leaf_type: LeafType,
}

/// The scene's tree placements.
pub const TREE_LAYOUT: [TreeSpec; 2] = [
    TreeSpec {
        position: Vec3::new(0.0, -4.7, 23.0),
        scale: 0.35,
        rotation: 0.1,
        leaf_type: LeafType::Two,
    },
    TreeSpec {
        position: Vec3::new(-10.0, -3.0, -12.0),
        scale: 0.25,
        rotation: 1.7,
        leaf_type: LeafType::One,
    },
];

#[derive(Debug, Clone)]
pub struct TreePool {
    specs: Vec<TreeSpec>,
    buffer: InstancedParticleBuffer<TreeChannels>,
}

impl TreePool {
    pub fn new(specs: &[TreeSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Err(EffectError::EmptyPool);
        }
        let mut buffer: InstancedParticleBuffer<TreeChannels> = InstancedParticleBuffer::new(specs.len());
        let ch = buffer.layout_mut();
        for (i, t) in specs.iter().enumerate() {
            ch.positions.set(i, t.position.to_array());
            ch.scales.set(i, [t.scale; 3]);
            ch.rotation.set(i, t.rotation);
            ch.leaf_type.set(i, t.leaf_type.as_attribute());
        }
        buffer.mark_all_dirty();
        log::info!("Tree pool: {} instances", specs.len());
        Ok(Self {
            specs: specs.to_vec(),
            buffer,
        })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[TreeSpec] {
        &self.specs
    }

    pub fn buffer(&self) -> &InstancedParticleBuffer<TreeChannels> {
        &self.buffer
    }

    /// Bytes of every channel, for creating the GPU buffers.
    pub fn channel_bytes(&self) -> Vec<(ChannelId, Vec<u8>)> {
        self.buffer.snapshot()
    }

    /// The vertex stage multiplies positions by the yaw matrix from the right,
    /// which is a rotation by `-rotation` in glam terms.
    pub fn model_matrix(&self, index: usize) -> Mat4 {
        let t = &self.specs[index];
        Transform::from_scale_yaw_position(t.scale, -t.rotation, t.position).to_matrix()
    }

    pub fn model_matrices(&self) -> Vec<Mat4> {
        (0..self.specs.len()).map(|i| self.model_matrix(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_written_from_layout() {
        let pool = TreePool::new(&TREE_LAYOUT).unwrap();
        assert_eq!(pool.len(), 2);
        let ch = pool.buffer().layout();
        assert_eq!(ch.positions.get(0), [0.0, -4.7, 23.0]);
        assert_eq!(ch.scales.get(1), [0.25; 3]);
        assert_eq!(ch.rotation.get(1), 1.7);
        assert_eq!(ch.leaf_type.as_slice(), &[2.0, 1.0]);
    }

    #[test]
    fn attributes_stay_bit_identical_across_reads() {
        let pool = TreePool::new(&TREE_LAYOUT).unwrap();
        let first = pool.channel_bytes();
        for _ in 0..1000 {
            let _ = pool.model_matrices();
            assert_eq!(pool.channel_bytes(), first);
        }
    }

    #[test]
    fn model_matrix_matches_vertex_stage() {
        let pool = TreePool::new(&TREE_LAYOUT).unwrap();
        let spec = pool.specs()[1];
        let local = Vec3::new(1.0, 2.0, 3.0);
        // pos *= scale; pos = transpose(rotY) * pos; pos += positions
        let (s, c) = spec.rotation.sin_cos();
        let p = local * spec.scale;
        let rotated = Vec3::new(c * p.x - s * p.z, p.y, s * p.x + c * p.z);
        let expected = rotated + spec.position;
        let got = pool.model_matrix(1).transform_point3(local);
        assert!((got - expected).length() < 1e-5, "{got} vs {expected}");
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert_eq!(TreePool::new(&[]).unwrap_err(), EffectError::EmptyPool);
    }
}
