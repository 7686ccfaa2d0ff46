//! Free-fly camera for viewing the scene.

use bytemuck::{Pod, Zeroable};
use engine_core::Transform;
use glam::{Mat4, Quat, Vec2, Vec3};

/// Perspective camera with configurable FOV and clipping planes.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera transform (position and rotation).
    pub transform: Transform,
    /// Field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Mouse sensitivity for look controls.
    pub sensitivity: f32,
    pitch: f32,
    yaw: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            fov_degrees: 60.0,
            near: 0.1,
            far: 5000.0,
            aspect: 16.0 / 9.0,
            sensitivity: 0.002,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            transform: Transform::from_position(position),
            ..Default::default()
        }
    }

    /// Update aspect ratio (call on window resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Process mouse movement for look controls.
    pub fn process_mouse(&mut self, delta_x: f32, delta_y: f32) {
        let yaw = self.yaw - delta_x * self.sensitivity;
        let pitch = self.pitch - delta_y * self.sensitivity;
        self.set_yaw_pitch(yaw, pitch);
    }

    /// Free-fly in camera space: x = strafe, y = forward/back, `move_y` = vertical.
    pub fn process_fly(&mut self, move_xy: Vec2, move_y: f32, speed: f32, dt: f32) {
        let mut velocity = Vec3::ZERO;
        velocity += self.transform.forward() * move_xy.y;
        velocity += self.transform.right() * move_xy.x;
        velocity += self.transform.up() * move_y;

        if velocity.length_squared() > 0.0 {
            velocity = velocity.normalize() * speed * dt;
            self.transform.translate(velocity);
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        let eye = self.transform.position;
        let target = eye + self.transform.forward();
        Mat4::look_at_rh(eye, target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// World rotation; the fog billboards face the camera with it.
    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Set yaw and pitch directly (in radians) and rebuild rotation.
    pub fn set_yaw_pitch(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        let max_pitch = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = pitch.clamp(-max_pitch, max_pitch);
        self.transform.rotation = Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch);
    }

    /// Point the camera at `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.transform.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        let yaw = (-dir.x).atan2(-dir.z);
        let pitch = dir.y.asin();
        self.set_yaw_pitch(yaw, pitch);
    }
}

/// Camera uniform data for GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub position: [f32; 4], // w unused, padding
    /// Surface size in pixels, for mapping fragment coordinates into off-screen targets.
    pub viewport: [f32; 2],
    pub near: f32,
    pub far: f32,
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 4],
            viewport: [1.0, 1.0],
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn update(&mut self, camera: &Camera, viewport: (u32, u32)) {
        self.view = camera.view_matrix().to_cols_array_2d();
        self.proj = camera.projection_matrix().to_cols_array_2d();
        self.view_proj = camera.view_projection_matrix().to_cols_array_2d();
        let pos = camera.position();
        self.position = [pos.x, pos.y, pos.z, 1.0];
        self.viewport = [viewport.0.max(1) as f32, viewport.1.max(1) as f32];
        self.near = camera.near;
        self.far = camera.far;
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_16_byte_multiple() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 224);
    }

    #[test]
    fn look_at_faces_target() {
        let mut cam = Camera::new(Vec3::new(0.0, 10.0, 50.0));
        cam.look_at(Vec3::new(0.0, 10.0, 0.0));
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-5);
        cam.look_at(Vec3::new(50.0, 10.0, 50.0));
        assert!((cam.forward() - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = Camera::default();
        cam.set_yaw_pitch(0.0, 10.0);
        assert!(cam.pitch() < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn uniform_carries_clip_range_and_viewport() {
        let mut cam = Camera::default();
        cam.near = 0.5;
        cam.far = 2000.0;
        let mut u = CameraUniform::new();
        u.update(&cam, (1920, 0));
        assert_eq!(u.near, 0.5);
        assert_eq!(u.far, 2000.0);
        assert_eq!(u.viewport, [1920.0, 1.0]);
    }
}
