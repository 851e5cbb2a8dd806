//! Triangle primitive with ray and box queries

use crate::core::types::Vec3;
use super::aabb::Aabb;
use super::ray::Ray;

/// Determinant below which a ray counts as parallel to the triangle plane
const PARALLEL_EPSILON: f32 = 1e-9;

/// Slack on barycentric bounds. Hits on a shared edge are reported by both
/// triangles and merged later, instead of slipping between them.
const BARYCENTRIC_SLACK: f32 = 1e-6;

/// Twice-area threshold under which a triangle is treated as degenerate
const DEGENERATE_AREA: f32 = 1e-12;

/// A single world-space triangle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

/// A ray/triangle intersection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance along the ray
    pub t: f32,
    /// Whether the ray leaves the solid here (direction agrees with the
    /// face normal)
    pub exiting: bool,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Unnormalized face normal, `(b - a) x (c - a)`
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a)
    }

    pub fn area(&self) -> f32 {
        self.normal().length() * 0.5
    }

    /// Zero-area triangles contribute no occupancy
    pub fn is_degenerate(&self) -> bool {
        self.normal().length_squared() <= DEGENERATE_AREA * DEGENERATE_AREA
    }

    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.a.min(self.b).min(self.c),
            self.a.max(self.b).max(self.c),
        )
    }

    /// Same triangle with reversed winding
    pub fn flipped(&self) -> Triangle {
        Triangle::new(self.a, self.c, self.b)
    }

    /// Signed volume of the tetrahedron spanned with `apex`
    pub fn signed_volume(&self, apex: Vec3) -> f32 {
        (self.a - apex).dot((self.b - apex).cross(self.c - apex)) / 6.0
    }

    /// Möller-Trumbore intersection. Returns hits with `t >= 0`; edge and
    /// vertex hits are inclusive.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let h = ray.direction.cross(edge2);
        let det = edge1.dot(h);

        if det.abs() < PARALLEL_EPSILON {
            return None;
        }

        let f = 1.0 / det;
        let s = ray.origin - self.a;
        let u = f * s.dot(h);
        if !(-BARYCENTRIC_SLACK..=1.0 + BARYCENTRIC_SLACK).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < -BARYCENTRIC_SLACK || u + v > 1.0 + BARYCENTRIC_SLACK {
            return None;
        }

        let t = f * edge2.dot(q);
        if t < 0.0 {
            return None;
        }

        // det = -direction . normal
        Some(RayHit { t, exiting: det < 0.0 })
    }

    /// Separating-axis overlap test against an axis-aligned box.
    /// Touching counts as overlapping. Degenerate triangles never overlap.
    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        if self.is_degenerate() {
            return false;
        }

        let center = aabb.center();
        let half = aabb.half_extent();

        let t0 = self.a - center;
        let t1 = self.b - center;
        let t2 = self.c - center;

        // Box face normals
        for axis in 0..3 {
            let lo = t0[axis].min(t1[axis]).min(t2[axis]);
            let hi = t0[axis].max(t1[axis]).max(t2[axis]);
            if lo > half[axis] || hi < -half[axis] {
                return false;
            }
        }

        // Triangle plane
        let normal = (t1 - t0).cross(t2 - t0);
        let offset = normal.dot(t0);
        let radius = half.dot(normal.abs());
        if offset.abs() > radius {
            return false;
        }

        // Box edge x triangle edge
        let edges = [t1 - t0, t2 - t1, t0 - t2];
        for box_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            for edge in edges {
                let axis = box_axis.cross(edge);
                if axis.length_squared() < 1e-12 {
                    continue;
                }
                let p0 = t0.dot(axis);
                let p1 = t1.dot(axis);
                let p2 = t2.dot(axis);
                let radius = half.dot(axis.abs());
                if p0.min(p1).min(p2) > radius || p0.max(p1).max(p2) < -radius {
                    return false;
                }
            }
        }

        true
    }
}
