//! Scalar helpers with shader semantics.

use glam::Vec3;

/// Hermite step. `edge0 == edge1` degenerates to a hard step at the edge.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
pub fn smoothstep3(edge0: f32, edge1: f32, v: Vec3) -> Vec3 {
    Vec3::new(
        smoothstep(edge0, edge1, v.x),
        smoothstep(edge0, edge1, v.y),
        smoothstep(edge0, edge1, v.z),
    )
}

#[inline]
pub fn saturate(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothstep_edges_and_midpoint() {
        assert_eq!(smoothstep(0.1, 0.9, 0.0), 0.0);
        assert_eq!(smoothstep(0.1, 0.9, 1.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(0.5, 0.5, 0.4), 0.0);
    }
}
