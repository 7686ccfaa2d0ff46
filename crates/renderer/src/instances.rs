//! GPU-side instance storage: per-frame model matrices and per-channel
//! attribute buffers for the instanced effects.

use std::ops::Range;

use effects::ChannelId;
use wgpu::util::DeviceExt;

use crate::vertex::{ChannelLayout, InstanceData};

/// Slots `[offset, offset + wanted)` clipped to `capacity`.
fn allocate(offset: u32, capacity: u32, wanted: usize) -> Range<u32> {
    let remaining = capacity.saturating_sub(offset) as usize;
    let count = wanted.min(remaining) as u32;
    offset..offset + count
}

/// Model-matrix buffer shared by every draw in a frame.
///
/// Each draw writes to its own region so the `queue.write_buffer` calls,
/// which all land before the command buffer runs, do not overwrite each other.
pub struct InstanceArena {
    buffer: wgpu::Buffer,
    capacity: u32,
    offset: u32,
}

impl InstanceArena {
    pub fn new(device: &wgpu::Device, capacity: u32) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (capacity as usize * std::mem::size_of::<InstanceData>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            capacity,
            offset: 0,
        }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Copy `instances` into the next free region and return its slot range.
    /// Instances past the capacity are dropped.
    pub fn push(&mut self, queue: &wgpu::Queue, instances: &[InstanceData]) -> Range<u32> {
        let range = allocate(self.offset, self.capacity, instances.len());
        if range.is_empty() {
            if !instances.is_empty() {
                log::warn!("Instance buffer full, dropping {} instances", instances.len());
            }
            return range;
        }
        let byte_offset = (range.start as usize * std::mem::size_of::<InstanceData>()) as wgpu::BufferAddress;
        let count = range.len();
        queue.write_buffer(&self.buffer, byte_offset, bytemuck::cast_slice(&instances[..count]));
        self.offset = range.end;
        range
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// One vertex buffer per instance attribute channel.
pub struct ChannelBuffers {
    buffers: Vec<(ChannelId, wgpu::Buffer)>,
    instance_count: u32,
}

impl ChannelBuffers {
    pub fn new(device: &wgpu::Device, label: &str, channels: &[(ChannelId, Vec<u8>)], instance_count: u32) -> Self {
        let buffers = channels
            .iter()
            .map(|(id, bytes)| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} {}", id.label())),
                    contents: bytes,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                (*id, buffer)
            })
            .collect();
        Self {
            buffers,
            instance_count,
        }
    }

    fn get(&self, id: ChannelId) -> Option<&wgpu::Buffer> {
        self.buffers.iter().find(|(c, _)| *c == id).map(|(_, b)| b)
    }

    /// Upload one channel. Unknown channels are ignored.
    pub fn write(&self, queue: &wgpu::Queue, id: ChannelId, bytes: &[u8]) {
        match self.get(id) {
            Some(buffer) => queue.write_buffer(buffer, 0, bytes),
            None => log::warn!("No GPU buffer for channel {}", id.label()),
        }
    }

    /// Bind channels in `layouts` order starting at vertex slot `first_slot`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, first_slot: u32, layouts: &[ChannelLayout]) {
        for (slot, layout) in (first_slot..).zip(layouts) {
            if let Some(buffer) = self.get(layout.id) {
                pass.set_vertex_buffer(slot, buffer.slice(..));
            }
        }
    }

    /// True when every channel a program reads has a buffer.
    pub fn covers(&self, layouts: &[ChannelLayout]) -> bool {
        layouts.iter().all(|l| self.get(l.id).is_some())
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }
}
