//! Directional light lookup.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    Ambient,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
}

/// Remembers the first directional light's position.
///
/// The lights are scanned once, on the first poll that sees a non-empty set.
/// A light that moves afterwards is not re-read.
#[derive(Debug, Default)]
pub struct LightCache {
    scanned: bool,
    position: Option<Vec3>,
}

impl LightCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true on the poll that performed the scan.
    pub fn poll(&mut self, lights: &[Light]) -> bool {
        if self.scanned || lights.is_empty() {
            return false;
        }
        self.scanned = true;
        self.position = lights
            .iter()
            .find(|l| l.kind == LightKind::Directional)
            .map(|l| l.position);
        match self.position {
            Some(p) => log::info!("directional light found at {p}"),
            None => log::warn!("no directional light among {} lights", lights.len()),
        }
        true
    }

    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    pub fn is_scanned(&self) -> bool {
        self.scanned
    }
}
