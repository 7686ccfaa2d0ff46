//! Viewport resize notifications.
//!
//! The host publishes window sizes as they arrive. Each effect that owns
//! size-dependent GPU resources holds a [`ResizeSubscription`]; the latest
//! size is parked there until the effect applies it at a frame boundary.
//! Dropping the subscription unregisters it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Viewport size in logical (CSS-style) pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self { width, height, pixel_ratio }
    }

    /// Size in device pixels, never smaller than 1x1.
    pub fn device_pixels(&self) -> (u32, u32) {
        let ratio = if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        };
        let w = (self.width as f32 * ratio).round() as u32;
        let h = (self.height as f32 * ratio).round() as u32;
        (w.max(1), h.max(1))
    }
}

type Slot = Arc<Mutex<Option<ViewportSize>>>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    slots: HashMap<u64, Slot>,
}

/// Fan-out of resize events to live subscribers. Cheap to clone.
#[derive(Clone, Default)]
pub struct ResizeBus {
    inner: Arc<Mutex<BusInner>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means a panic happened while holding it; the data is
    // a plain size record and stays usable.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ResizeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener. Keep the returned handle alive for as long as
    /// the owner wants resize events.
    pub fn subscribe(&self) -> ResizeSubscription {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        let slot: Slot = Arc::new(Mutex::new(None));
        inner.slots.insert(id, slot.clone());
        ResizeSubscription {
            id,
            slot,
            bus: self.inner.clone(),
        }
    }

    /// Record `size` as the latest pending size for every subscriber.
    pub fn publish(&self, size: ViewportSize) {
        let inner = lock(&self.inner);
        for slot in inner.slots.values() {
            *lock(slot) = Some(size);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).slots.len()
    }
}

/// Owned registration on a [`ResizeBus`].
pub struct ResizeSubscription {
    id: u64,
    slot: Slot,
    bus: Arc<Mutex<BusInner>>,
}

impl ResizeSubscription {
    /// Take the most recent size published since the last call.
    pub fn take_pending(&self) -> Option<ViewportSize> {
        lock(&self.slot).take()
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        lock(&self.bus).slots.remove(&self.id);
    }
}

impl std::fmt::Debug for ResizeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeSubscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_size_wins() {
        let bus = ResizeBus::new();
        let sub = bus.subscribe();
        bus.publish(ViewportSize::new(800, 600, 1.0));
        bus.publish(ViewportSize::new(1024, 768, 2.0));
        assert_eq!(sub.take_pending(), Some(ViewportSize::new(1024, 768, 2.0)));
        assert_eq!(sub.take_pending(), None);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let bus = ResizeBus::new();
        let a = bus.subscribe();
        {
            let _b = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 1);
        drop(a);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(ViewportSize::new(1, 1, 1.0));
    }

    #[test]
    fn device_pixels_apply_ratio_and_clamp() {
        assert_eq!(ViewportSize::new(640, 480, 1.5).device_pixels(), (960, 720));
        assert_eq!(ViewportSize::new(0, 0, 2.0).device_pixels(), (1, 1));
        assert_eq!(ViewportSize::new(10, 10, f32::NAN).device_pixels(), (10, 10));
    }
}
