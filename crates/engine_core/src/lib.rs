//! Core types shared by the cloud-sea effect crates.
//!
//! This crate provides the foundational types used across all systems:
//! - Transform and spatial components
//! - Host frame clock
//! - Scene components for the drawable host
//! - Viewport resize notifications with owned subscriptions

pub mod components;
pub mod resize;
pub mod time;
pub mod transform;

pub use components::*;
pub use resize::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
