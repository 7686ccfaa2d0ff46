//! Scene components used by the drawable host.

/// Visibility flag consulted by every render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Self(true)
    }
}

/// Human-readable name, mostly for logs.
#[derive(Debug, Clone, Default)]
pub struct Name(pub String);

/// Tag: never drawn into the cloud depth pre-pass. Blended billboards carry it
/// since they have no meaningful depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthInvisible;

/// Tag: a floating island piece animated by the island bobber.
#[derive(Debug, Clone, Copy)]
pub struct IslandPiece {
    /// Index into the island simulator's piece list.
    pub index: usize,
}
