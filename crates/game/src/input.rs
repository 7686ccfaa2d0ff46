//! Keyboard and mouse state for the fly camera.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

#[derive(Debug, Default)]
pub struct InputState {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_pressed: HashSet<MouseButton>,
    /// Mouse movement delta this frame.
    mouse_delta: Vec2,
    /// Accumulated between frames while the cursor is locked.
    accumulated_delta: Vec2,
    cursor_locked: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_pressed.clear();
        self.mouse_delta = self.accumulated_delta;
        self.accumulated_delta = Vec2::ZERO;
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.keys_held.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if state.is_pressed() {
            self.mouse_pressed.insert(button);
        }
    }

    /// Raw device motion; ignored while the cursor is free.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        if self.cursor_locked {
            self.accumulated_delta.x += delta.0 as f32;
            self.accumulated_delta.y += delta.1 as f32;
        }
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    /// Unlocking also drops any motion gathered since the last frame.
    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.cursor_locked = locked;
        if !locked {
            self.accumulated_delta = Vec2::ZERO;
        }
    }

    /// WASD as a normalized vector: x strafes, y moves forward.
    pub fn get_movement_input(&self) -> Vec2 {
        let mut movement = Vec2::ZERO;
        if self.is_key_held(KeyCode::KeyW) {
            movement.y += 1.0;
        }
        if self.is_key_held(KeyCode::KeyS) {
            movement.y -= 1.0;
        }
        if self.is_key_held(KeyCode::KeyA) {
            movement.x -= 1.0;
        }
        if self.is_key_held(KeyCode::KeyD) {
            movement.x += 1.0;
        }
        movement.normalize_or_zero()
    }

    /// Space rises, Shift sinks.
    pub fn get_vertical_input(&self) -> f32 {
        let mut v = 0.0;
        if self.is_key_held(KeyCode::Space) {
            v += 1.0;
        }
        if self.is_key_held(KeyCode::ShiftLeft) || self.is_key_held(KeyCode::ShiftRight) {
            v -= 1.0;
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_movement_is_normalized() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        input.process_keyboard(KeyCode::KeyD, ElementState::Pressed);
        let m = input.get_movement_input();
        assert!((m.length() - 1.0).abs() < 1e-6);
        assert!(m.x > 0.0 && m.y > 0.0);
        input.process_keyboard(KeyCode::KeyW, ElementState::Released);
        input.process_keyboard(KeyCode::KeyD, ElementState::Released);
        assert_eq!(input.get_movement_input(), Vec2::ZERO);
    }

    #[test]
    fn pressed_lasts_one_frame_and_ignores_repeats() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Escape, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::Escape));
        input.begin_frame();
        input.process_keyboard(KeyCode::Escape, ElementState::Pressed);
        assert!(!input.is_key_pressed(KeyCode::Escape));
        assert!(input.is_key_held(KeyCode::Escape));
    }

    #[test]
    fn mouse_motion_only_counts_while_locked() {
        let mut input = InputState::new();
        input.process_mouse_motion((5.0, 5.0));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.set_cursor_locked(true);
        input.process_mouse_motion((3.0, -1.0));
        input.process_mouse_motion((1.0, 0.0));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, -1.0));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn vertical_keys_cancel() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert_eq!(input.get_vertical_input(), 1.0);
        input.process_keyboard(KeyCode::ShiftLeft, ElementState::Pressed);
        assert_eq!(input.get_vertical_input(), 0.0);
    }
}
