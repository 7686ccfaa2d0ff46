//! GPU uniform layouts. Field order matches the WGSL structs in the renderer;
//! every struct is a multiple of 16 bytes.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use crate::cloud::CloudConfig;
use crate::depth_fade::DepthFadeConfig;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CloudUniform {
    pub time: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub noise_height: f32,
    /// Depth target size in device pixels.
    pub resolution: [f32; 2],
    pub depth_scale: f32,
    pub depth_falloff: f32,
    pub jump: [f32; 2],
    pub tiling: f32,
    pub speed: f32,
    pub flow_strength: f32,
    pub flow_offset: f32,
    pub noise_scale: f32,
    pub detail_scroll: f32,
    pub base_noise_scale: f32,
    pub base_noise_speed: f32,
    pub base_noise_strength: f32,
    pub cloud_width: f32,
}

impl CloudUniform {
    pub fn new(cloud: &CloudConfig, fade: &DepthFadeConfig, resolution: (u32, u32)) -> Self {
        Self {
            time: 0.0,
            camera_near: 0.1,
            camera_far: 1000.0,
            noise_height: cloud.noise_height,
            resolution: [resolution.0 as f32, resolution.1 as f32],
            depth_scale: fade.depth_scale,
            depth_falloff: fade.depth_falloff,
            jump: cloud.jump.to_array(),
            tiling: cloud.tiling,
            speed: cloud.speed,
            flow_strength: cloud.flow_strength,
            flow_offset: cloud.flow_offset,
            noise_scale: cloud.noise_scale,
            detail_scroll: cloud.detail_scroll,
            base_noise_scale: cloud.base_noise_scale,
            base_noise_speed: cloud.base_noise_speed,
            base_noise_strength: cloud.base_noise_strength,
            cloud_width: cloud.plane_size,
        }
    }
}

/// Billboard uniform for the fog particles.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FogUniform {
    pub camera_quaternion: [f32; 4],
    pub time: f32,
    /// Height of the fog group; instance positions are relative to it.
    pub group_offset_y: f32,
    pub _pad: [f32; 2],
}

impl FogUniform {
    pub fn new(camera_rotation: Quat, time: f32, group_offset_y: f32) -> Self {
        Self {
            camera_quaternion: camera_rotation.to_array(),
            time,
            group_offset_y,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TreeUniform {
    pub light_pos: [f32; 3],
    pub time: f32,
    pub eye: [f32; 3],
    pub _pad: f32,
}

impl TreeUniform {
    pub fn new(light_pos: Vec3, eye: Vec3, time: f32) -> Self {
        Self {
            light_pos: light_pos.to_array(),
            time,
            eye: eye.to_array(),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct HomespaceUniform {
    pub light_pos: [f32; 3],
    pub time: f32,
}

impl HomespaceUniform {
    pub fn new(light_pos: Vec3, time: f32) -> Self {
        Self {
            light_pos: light_pos.to_array(),
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn sizes_are_16_byte_multiples() {
        assert_eq!(size_of::<CloudUniform>(), 80);
        assert_eq!(size_of::<FogUniform>(), 32);
        assert_eq!(size_of::<TreeUniform>(), 32);
        assert_eq!(size_of::<HomespaceUniform>(), 16);
    }

    #[test]
    fn cloud_vec2_fields_are_8_byte_aligned() {
        assert_eq!(offset_of!(CloudUniform, resolution), 16);
        assert_eq!(offset_of!(CloudUniform, jump), 32);
        assert_eq!(offset_of!(CloudUniform, cloud_width), 76);
    }

    #[test]
    fn cloud_uniform_copies_config() {
        let u = CloudUniform::new(&CloudConfig::default(), &DepthFadeConfig::default(), (800, 600));
        assert_eq!(u.resolution, [800.0, 600.0]);
        assert_eq!(u.depth_scale, 25.0);
        assert_eq!(u.depth_falloff, 3.0);
        assert_eq!(u.jump, [0.24, 0.2]);
        assert_eq!(u.cloud_width, 2500.0);
    }

    #[test]
    fn tree_uniform_places_eye_at_16() {
        assert_eq!(offset_of!(TreeUniform, eye), 16);
        let u = TreeUniform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0), 7.0);
        assert_eq!(u.time, 7.0);
        assert_eq!(u.eye, [4.0, 5.0, 6.0]);
    }
}
