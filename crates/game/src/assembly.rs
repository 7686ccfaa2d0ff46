//! Tracks which textures each effect is waiting on. An effect is built once
//! all its inputs have arrived, and never if one of them failed.

use std::collections::HashMap;

use procgen::{TextureData, TextureGenerator};

use crate::assets::TextureSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Waiting,
    Ready,
    Failed,
}

/// Effects that need textures before they can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexturedEffect {
    Cloud,
    Fog,
    Trees,
}

impl TexturedEffect {
    pub const ALL: [TexturedEffect; 3] = [TexturedEffect::Cloud, TexturedEffect::Fog, TexturedEffect::Trees];

    pub fn textures(self) -> &'static [TextureSlot] {
        match self {
            TexturedEffect::Cloud => &[TextureSlot::DetailNoise, TextureSlot::FlowMap],
            TexturedEffect::Fog => &[TextureSlot::Smoke],
            TexturedEffect::Trees => &[
                TextureSlot::DetailNoise,
                TextureSlot::LeafOne,
                TextureSlot::LeafTwo,
                TextureSlot::Bark,
            ],
        }
    }
}

#[derive(Debug)]
enum Entry {
    Pending,
    Ready(TextureData),
    Failed,
}

#[derive(Debug, Default)]
pub struct TextureBank {
    entries: HashMap<TextureSlot, Entry>,
}

impl TextureBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a slot as requested from disk.
    pub fn mark_pending(&mut self, slot: TextureSlot) {
        self.entries.insert(slot, Entry::Pending);
    }

    pub fn insert(&mut self, slot: TextureSlot, data: TextureData) {
        self.entries.insert(slot, Entry::Ready(data));
    }

    pub fn fail(&mut self, slot: TextureSlot) {
        self.entries.insert(slot, Entry::Failed);
    }

    pub fn get(&self, slot: TextureSlot) -> Option<&TextureData> {
        match self.entries.get(&slot) {
            Some(Entry::Ready(data)) => Some(data),
            _ => None,
        }
    }

    /// Any failure wins over waiting; unknown slots count as waiting.
    pub fn readiness(&self, slots: &[TextureSlot]) -> Readiness {
        let mut waiting = false;
        for slot in slots {
            match self.entries.get(slot) {
                Some(Entry::Failed) => return Readiness::Failed,
                Some(Entry::Ready(_)) => {}
                Some(Entry::Pending) | None => waiting = true,
            }
        }
        if waiting {
            Readiness::Waiting
        } else {
            Readiness::Ready
        }
    }
}

/// Default procedural stand-in for a texture slot.
pub fn generate(slot: TextureSlot, generator: &mut TextureGenerator) -> TextureData {
    match slot {
        TextureSlot::DetailNoise => generator.generate_detail_noise(256, 8.0),
        TextureSlot::FlowMap => generator.generate_flow_map(256, 4.0),
        TextureSlot::Smoke => generator.generate_smoke(128),
        TextureSlot::LeafOne => generator.generate_leaves(256, 12.0),
        TextureSlot::LeafTwo => generator.generate_leaves(256, 20.0),
        TextureSlot::Bark => generator.generate_bark(128),
    }
}
