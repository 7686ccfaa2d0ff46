//! Per-instance attribute storage for hardware-instanced draws.
//!
//! Each attribute lives in its own contiguous channel (structure of arrays) so
//! it can be uploaded to its own vertex buffer. Simulations mutate channels in
//! place and then call [`AttributeChannel::mark_dirty`] once per batch; the
//! renderer drains dirty channels right before the draw.

use bytemuck::Pod;

/// Identifies an attribute channel; maps 1:1 to a shader instance attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Positions,
    Scales,
    Opacity,
    Distortion,
    TextureRotation,
    Rotation,
    LeafType,
}

impl ChannelId {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelId::Positions => "positions",
            ChannelId::Scales => "scales",
            ChannelId::Opacity => "opacity",
            ChannelId::Distortion => "distortion",
            ChannelId::TextureRotation => "textureRotation",
            ChannelId::Rotation => "rotation",
            ChannelId::LeafType => "leafType",
        }
    }
}

/// Fixed-length typed attribute array with a dirty flag.
#[derive(Debug, Clone)]
pub struct AttributeChannel<T: Pod> {
    id: ChannelId,
    data: Vec<T>,
    dirty: bool,
}

impl<T: Pod> AttributeChannel<T> {
    /// New zero-filled channel. Starts dirty so the first upload sends it.
    pub fn new(id: ChannelId, len: usize) -> Self {
        Self {
            id,
            data: vec![T::zeroed(); len],
            dirty: true,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.data[index]
    }

    /// Write one element. Does not flag the channel; call `mark_dirty` after the batch.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self.data[index] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return the dirty flag and clear it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Type-erased view used by the upload path.
pub trait DirtyChannel {
    fn id(&self) -> ChannelId;
    /// Number of f32 components per instance.
    fn item_size(&self) -> u32;
    fn bytes(&self) -> &[u8];
    fn is_dirty(&self) -> bool;
    fn take_dirty(&mut self) -> bool;
    fn mark_dirty(&mut self);
}

impl<T: Pod> DirtyChannel for AttributeChannel<T> {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn item_size(&self) -> u32 {
        (std::mem::size_of::<T>() / std::mem::size_of::<f32>()) as u32
    }

    fn bytes(&self) -> &[u8] {
        self.as_bytes()
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn take_dirty(&mut self) -> bool {
        AttributeChannel::take_dirty(self)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// A concrete set of channels for one effect.
pub trait InstanceLayout {
    fn with_capacity(capacity: usize) -> Self;
    fn channels(&self) -> Vec<&dyn DirtyChannel>;
    fn channels_mut(&mut self) -> Vec<&mut dyn DirtyChannel>;
}

/// Fixed-capacity pool of instance attributes. Slots are only ever recycled,
/// never added or removed.
#[derive(Debug, Clone)]
pub struct InstancedParticleBuffer<L: InstanceLayout> {
    capacity: usize,
    layout: L,
}

impl<L: InstanceLayout> InstancedParticleBuffer<L> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            layout: L::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut L {
        &mut self.layout
    }

    pub fn mark_all_dirty(&mut self) {
        for c in self.layout.channels_mut() {
            c.mark_dirty();
        }
    }

    pub fn any_dirty(&self) -> bool {
        self.layout.channels().iter().any(|c| c.is_dirty())
    }

    /// Hand every dirty channel to `upload` and clear its flag.
    pub fn drain_dirty(&mut self, mut upload: impl FnMut(ChannelId, &[u8])) {
        for c in self.layout.channels_mut() {
            if c.take_dirty() {
                upload(c.id(), c.bytes());
            }
        }
    }

    /// Bytes of every channel regardless of dirtiness (initial buffer creation).
    pub fn snapshot(&self) -> Vec<(ChannelId, Vec<u8>)> {
        self.layout
            .channels()
            .iter()
            .map(|c| (c.id(), c.bytes().to_vec()))
            .collect()
    }
}

/// Channels driven by the fog simulator.
#[derive(Debug, Clone)]
pub struct FogChannels {
    pub positions: AttributeChannel<[f32; 3]>,
    pub scales: AttributeChannel<[f32; 3]>,
    pub opacity: AttributeChannel<f32>,
    pub distortion: AttributeChannel<f32>,
    pub texture_rotation: AttributeChannel<f32>,
}

impl InstanceLayout for FogChannels {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: AttributeChannel::new(ChannelId::Positions, capacity),
            scales: AttributeChannel::new(ChannelId::Scales, capacity),
            opacity: AttributeChannel::new(ChannelId::Opacity, capacity),
            distortion: AttributeChannel::new(ChannelId::Distortion, capacity),
            texture_rotation: AttributeChannel::new(ChannelId::TextureRotation, capacity),
        }
    }

    fn channels(&self) -> Vec<&dyn DirtyChannel> {
        vec![
            &self.positions as &dyn DirtyChannel,
            &self.scales as &dyn DirtyChannel,
            &self.opacity as &dyn DirtyChannel,
            &self.distortion as &dyn DirtyChannel,
            &self.texture_rotation as &dyn DirtyChannel,
        ]
    }

    fn channels_mut(&mut self) -> Vec<&mut dyn DirtyChannel> {
        vec![
            &mut self.positions as &mut dyn DirtyChannel,
            &mut self.scales as &mut dyn DirtyChannel,
            &mut self.opacity as &mut dyn DirtyChannel,
            &mut self.distortion as &mut dyn DirtyChannel,
            &mut self.texture_rotation as &mut dyn DirtyChannel,
        ]
    }
}

/// Channels for the static tree instances.
#[derive(Debug, Clone)]
pub struct TreeChannels {
    pub positions: AttributeChannel<[f32; 3]>,
    pub scales: AttributeChannel<[f32; 3]>,
    pub rotation: AttributeChannel<f32>,
    pub leaf_type: AttributeChannel<f32>,
}

impl InstanceLayout for TreeChannels {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: AttributeChannel::new(ChannelId::Positions, capacity),
            scales: AttributeChannel::new(ChannelId::Scales, capacity),
            rotation: AttributeChannel::new(ChannelId::Rotation, capacity),
            leaf_type: AttributeChannel::new(ChannelId::LeafType, capacity),
        }
    }

    fn channels(&self) -> Vec<&dyn DirtyChannel> {
        vec![
            &self.positions as &dyn DirtyChannel,
            &self.scales as &dyn DirtyChannel,
            &self.rotation as &dyn DirtyChannel,
            &self.leaf_type as &dyn DirtyChannel,
        ]
    }

    fn channels_mut(&mut self) -> Vec<&mut dyn DirtyChannel> {
        vec![
            &mut self.positions as &mut dyn DirtyChannel,
            &mut self.scales as &mut dyn DirtyChannel,
            &mut self.rotation as &mut dyn DirtyChannel,
            &mut self.leaf_type as &mut dyn DirtyChannel,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_channels_start_dirty_and_zeroed() {
        let buf: InstancedParticleBuffer<FogChannels> = InstancedParticleBuffer::new(4);
        assert_eq!(buf.capacity(), 4);
        assert!(buf.any_dirty());
        assert_eq!(buf.layout().opacity.as_slice(), &[0.0; 4]);
        assert_eq!(buf.layout().positions.len(), 4);
    }

    #[test]
    fn drain_clears_flags_and_reports_each_channel_once() {
        let mut buf: InstancedParticleBuffer<TreeChannels> = InstancedParticleBuffer::new(2);
        let mut seen = Vec::new();
        buf.drain_dirty(|id, bytes| seen.push((id, bytes.len())));
        assert_eq!(
            seen,
            vec![
                (ChannelId::Positions, 24),
                (ChannelId::Scales, 24),
                (ChannelId::Rotation, 8),
                (ChannelId::LeafType, 8),
            ]
        );
        assert!(!buf.any_dirty());

        let mut count = 0;
        buf.drain_dirty(|_, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn set_does_not_flag_until_marked() {
        let mut buf: InstancedParticleBuffer<FogChannels> = InstancedParticleBuffer::new(3);
        buf.drain_dirty(|_, _| {});
        buf.layout_mut().opacity.set(1, 0.5);
        assert!(!buf.layout().opacity.is_dirty());
        buf.layout_mut().opacity.mark_dirty();

        let mut uploaded = Vec::new();
        buf.drain_dirty(|id, bytes| uploaded.push((id, bytes.to_vec())));
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].0, ChannelId::Opacity);
        let values: &[f32] = bytemuck::cast_slice(&uploaded[0].1);
        assert_eq!(values, &[0.0, 0.5, 0.0]);
    }

    #[test]
    fn item_sizes_match_shader_attributes() {
        let layout = FogChannels::with_capacity(1);
        let sizes: Vec<_> = layout.channels().iter().map(|c| (c.id(), c.item_size())).collect();
        assert_eq!(
            sizes,
            vec![
                (ChannelId::Positions, 3),
                (ChannelId::Scales, 3),
                (ChannelId::Opacity, 1),
                (ChannelId::Distortion, 1),
                (ChannelId::TextureRotation, 1),
            ]
        );
    }
}
