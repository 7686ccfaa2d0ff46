//! Frame clock driven by the host's per-frame timestamp.

/// Tracks the host timestamp handed to every frame callback.
///
/// The host reports milliseconds; shaders consume seconds. Timestamps that go
/// backwards are clamped to the previous value so time-dependent uniforms never
/// rewind.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    /// Last accepted timestamp in milliseconds.
    timestamp_ms: f64,
    /// Seconds between the last two accepted timestamps.
    delta: f32,
    /// Number of frames advanced so far.
    frame_count: u64,
    started: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the host timestamp for this frame.
    pub fn advance(&mut self, timestamp_ms: f64) {
        let ts = if timestamp_ms.is_finite() { timestamp_ms } else { self.timestamp_ms };
        if !self.started {
            self.started = true;
            self.delta = 0.0;
            self.timestamp_ms = ts.max(0.0);
        } else {
            if ts < self.timestamp_ms {
                log::debug!(
                    "Frame timestamp went backwards ({} < {}), clamping",
                    ts,
                    self.timestamp_ms
                );
            }
            let next = ts.max(self.timestamp_ms);
            self.delta = ((next - self.timestamp_ms) / 1000.0) as f32;
            self.timestamp_ms = next;
        }
        self.frame_count += 1;
    }

    /// Current time in seconds (the `uTime` uniform).
    pub fn seconds(&self) -> f32 {
        (self.timestamp_ms / 1000.0) as f32
    }

    /// Current timestamp in milliseconds.
    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    /// Seconds elapsed since the previous frame.
    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
