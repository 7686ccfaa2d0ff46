//! Floating rock islands that bob up and down and slowly turn.

use std::f32::consts::FRAC_PI_2;

use engine_core::Transform;
use glam::{Quat, Vec3};
use rand::Rng;

/// Placement of the whole island group.
pub fn island_group_transform() -> Transform {
    Transform {
        position: Vec3::new(0.0, -85.0, -100.0),
        rotation: Quat::from_rotation_y(-FRAC_PI_2),
        scale: Vec3::splat(6.0),
    }
}

/// Exponential-squared distance fog switched on once the islands are in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneFog {
    pub color: Vec3,
    pub density: f32,
}

pub const ISLAND_SCENE_FOG: SceneFog = SceneFog {
    color: Vec3::new(30.0 / 255.0, 115.0 / 255.0, 1.0),
    density: 0.001,
};

impl SceneFog {
    /// Blend weight toward the fog color at `distance`.
    pub fn factor(&self, distance: f32) -> f32 {
        let d = self.density * distance;
        1.0 - (-d * d).exp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IslandMotion {
    /// Rest height in group space.
    pub origin_y: f32,
    /// Bob amplitude.
    pub amplitude: f32,
    /// Radians per second of the bob/turn phase.
    pub speed: f32,
    /// +1 or -1.
    pub direction: f32,
}

impl IslandMotion {
    pub fn sample<R: Rng>(origin_y: f32, rng: &mut R) -> Self {
        Self {
            origin_y,
            amplitude: 5.0 + rng.gen::<f32>() * 5.0,
            speed: 0.0125 + rng.gen::<f32>() * 0.0125,
            direction: if rng.gen::<f32>() > 0.5 { -1.0 } else { 1.0 },
        }
    }

    /// Height and yaw at time `t` seconds.
    pub fn pose(&self, t: f32) -> (f32, f32) {
        let phase = t * self.speed;
        (
            self.origin_y + phase.cos() * self.amplitude * self.direction,
            phase * self.direction,
        )
    }
}

/// Animates every island piece. Empty when the island model failed to load.
#[derive(Debug, Clone, Default)]
pub struct IslandBobber {
    pieces: Vec<IslandMotion>,
    local: Vec<Transform>,
}

impl IslandBobber {
    /// `rest` holds each piece's authored local transform.
    pub fn new<R: Rng>(rest: &[Transform], rng: &mut R) -> Self {
        let pieces = rest
            .iter()
            .map(|t| IslandMotion::sample(t.position.y, rng))
            .collect();
        Self {
            pieces,
            local: rest.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn motion(&self, index: usize) -> &IslandMotion {
        &self.pieces[index]
    }

    pub fn tick(&mut self, time_seconds: f32) {
        for (motion, local) in self.pieces.iter().zip(self.local.iter_mut()) {
            let (y, yaw) = motion.pose(time_seconds);
            local.position.y = y;
            local.rotation = Quat::from_rotation_y(yaw);
        }
    }

    /// Current local transform of a piece (group space).
    pub fn local_transform(&self, index: usize) -> &Transform {
        &self.local[index]
    }

    pub fn world_matrices(&self) -> Vec<glam::Mat4> {
        let group = island_group_transform();
        self.local.iter().map(|l| group.mul_transform(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn scene_fog_grows_with_distance() {
        assert_eq!(ISLAND_SCENE_FOG.factor(0.0), 0.0);
        let near = ISLAND_SCENE_FOG.factor(100.0);
        let far = ISLAND_SCENE_FOG.factor(2000.0);
        assert!(near < 0.02);
        assert!(far > 0.95 && far <= 1.0);
    }

    #[test]
    fn motion_ranges() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let m = IslandMotion::sample(1.0, &mut rng);
            assert!((5.0..10.0).contains(&m.amplitude));
            assert!((0.0125..0.025).contains(&m.speed));
            assert!(m.direction == 1.0 || m.direction == -1.0);
        }
    }

    #[test]
    fn pose_at_time_zero_is_peak() {
        let m = IslandMotion { origin_y: 2.0, amplitude: 5.0, speed: 0.02, direction: -1.0 };
        let (y, yaw) = m.pose(0.0);
        assert_eq!(y, -3.0);
        assert_eq!(yaw, 0.0);
        let (_, yaw) = m.pose(100.0);
        assert!((yaw + 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_bobber_ticks_without_pieces() {
        let mut b = IslandBobber::default();
        b.tick(12.0);
        assert!(b.is_empty());
        assert!(b.world_matrices().is_empty());
    }

    #[test]
    fn tick_moves_pieces() {
        let mut rng = StdRng::seed_from_u64(1);
        let rest = [Transform::from_position(Vec3::new(3.0, 1.0, 0.0))];
        let mut b = IslandBobber::new(&rest, &mut rng);
        b.tick(50.0);
        let m = *b.motion(0);
        let (y, _) = m.pose(50.0);
        assert_eq!(b.local_transform(0).position.y, y);
        assert_eq!(b.local_transform(0).position.x, 3.0);
    }
}
