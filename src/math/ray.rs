//! Ray type and axis directions

use crate::core::types::Vec3;
use super::aabb::Aabb;

/// Principal grid axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Unit vector along the positive axis
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// One of the six axis-aligned ray directions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisDirection {
    pub axis: Axis,
    pub positive: bool,
}

impl AxisDirection {
    /// All six directions, positive before negative per axis
    pub const ALL: [AxisDirection; 6] = [
        AxisDirection::new(Axis::X, true),
        AxisDirection::new(Axis::X, false),
        AxisDirection::new(Axis::Y, true),
        AxisDirection::new(Axis::Y, false),
        AxisDirection::new(Axis::Z, true),
        AxisDirection::new(Axis::Z, false),
    ];

    pub const fn new(axis: Axis, positive: bool) -> Self {
        Self { axis, positive }
    }

    /// Unit direction vector
    pub fn vector(self) -> Vec3 {
        if self.positive { self.axis.unit() } else { -self.axis.unit() }
    }

    /// Ray starting at `origin` along this direction
    pub fn ray_from(self, origin: Vec3) -> Ray {
        Ray::new(origin, self.vector())
    }
}

/// A ray defined by origin and direction
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Precomputed 1/direction for fast AABB intersection
    pub inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray (direction should be normalized)
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: Vec3::new(
                1.0 / direction.x,
                1.0 / direction.y,
                1.0 / direction.z,
            ),
        }
    }

    /// Get point along ray at parameter t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray-AABB intersection using slab method
    /// Returns Some((t_near, t_far)) if intersection, None otherwise.
    ///
    /// Axes with a zero direction component are tested as a containment
    /// check on the origin, so axis-aligned rays starting exactly on a slab
    /// plane never produce `0 * inf` NaNs.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            if self.direction[axis] == 0.0 {
                if origin < aabb.min[axis] || origin > aabb.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = self.inv_direction[axis];
            let t1 = (aabb.min[axis] - origin) * inv;
            let t2 = (aabb.max[axis] - origin) * inv;
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }

        if t_near <= t_far && t_far >= 0.0 {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.at(5.0), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_intersects_aabb_hit() {
        let ray = Ray::new(Vec3::new(-2.0, 0.5, 0.5), Vec3::X);
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let hit = ray.intersects_aabb(&aabb);
        assert!(hit.is_some());
        let (t_near, t_far) = hit.unwrap();
        assert!((t_near - 2.0).abs() < 0.001);
        assert!((t_far - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_intersects_aabb_miss() {
        let ray = Ray::new(Vec3::new(-2.0, 5.0, 0.5), Vec3::X);
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(ray.intersects_aabb(&aabb).is_none());
    }

    #[test]
    fn test_intersects_aabb_inside() {
        let ray = Ray::new(Vec3::splat(0.5), Vec3::X);
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let hit = ray.intersects_aabb(&aabb);
        assert!(hit.is_some());
        let (t_near, _) = hit.unwrap();
        assert_eq!(t_near, 0.0); // Inside, so t_near clamped to 0
    }

    #[test]
    fn test_intersects_aabb_origin_on_slab_plane() {
        // y == aabb.min.y with a zero y direction component
        let ray = Ray::new(Vec3::new(-1.0, 0.0, 0.5), Vec3::X);
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let (t_near, t_far) = ray.intersects_aabb(&aabb).unwrap();
        assert!((t_near - 1.0).abs() < 1e-6);
        assert!((t_far - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_axis_directions() {
        let vectors: Vec<Vec3> = AxisDirection::ALL.iter().map(|d| d.vector()).collect();
        assert_eq!(vectors.len(), 6);
        assert_eq!(vectors.iter().copied().sum::<Vec3>(), Vec3::ZERO);
        assert_eq!(AxisDirection::new(Axis::Y, false).vector(), -Vec3::Y);
    }
}
