use serde::{Deserialize, Serialize};

/// 3D vector. Used for both positions and Euler rotations on the wire,
/// matching what the browser client reports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_along_axis() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.0, 50.0);
        assert!((a.distance(&b) - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-4.0, 0.5, 9.0);
        assert!((a.distance(&b) - b.distance(&a)).abs() < f32::EPSILON);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = Vec3::new(7.0, -2.0, 13.5);
        assert_eq!(a.distance(&a), 0.0);
    }
}
