//! Procedural texture generation for the cloud sea, fog and foliage.

pub mod textures;

pub use textures::*;
