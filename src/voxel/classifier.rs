//! Occupancy classification of lattice points.
//!
//! Two interchangeable strategies share the read-only [`SpatialIndex`]:
//!
//! - [`ParityClassifier`] casts rays along all six axis directions. A
//!   direction votes when its first surface hit lies within one cell of the
//!   point or when it crosses the surface an odd number of times; the point
//!   is occupied once the votes reach the axis threshold.
//! - [`HybridClassifier`] marks the point occupied when a box of width
//!   `2 * cell_size` around it overlaps any triangle, and otherwise requires
//!   the nearest crossing along +X, +Y and +Z to leave the solid.
//!
//! Both are pure functions of the point, so repeated calls agree and
//! classification can be spread over any number of workers.

use crate::bvh::{CrossingKind, SpatialIndex};
use crate::core::types::Vec3;
use crate::math::{Aabb, Axis, AxisDirection};
use crate::pipeline::config::{ClassificationParams, Strategy};

/// Per-point classification result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Occupancy {
    Outside,
    /// Inside the solid or on its boundary
    Occupied,
}

impl Occupancy {
    pub fn is_occupied(self) -> bool {
        self == Occupancy::Occupied
    }

    fn from_bool(occupied: bool) -> Self {
        if occupied { Occupancy::Occupied } else { Occupancy::Outside }
    }
}

/// Decides whether a world-space point lies inside or on the mesh
pub trait OccupancyClassifier: Send + Sync {
    /// Full classification of one point
    fn classify(&self, point: Vec3) -> Occupancy;

    /// Re-test restricted to the two directions along `axis`
    fn classify_along(&self, point: Vec3, axis: Axis) -> Occupancy;

    /// Grid spacing the classifier was configured with
    fn cell_size(&self) -> f32;
}

/// Six-direction ray parity with a configurable axis-agreement threshold
pub struct ParityClassifier<'a> {
    index: &'a SpatialIndex,
    cell_size: f32,
    axis_threshold: u8,
}

impl<'a> ParityClassifier<'a> {
    /// `axis_threshold` is clamped to 1..=6
    pub fn new(index: &'a SpatialIndex, cell_size: f32, axis_threshold: u8) -> Self {
        Self {
            index,
            cell_size,
            axis_threshold: axis_threshold.clamp(1, 6),
        }
    }

    pub fn axis_threshold(&self) -> u8 {
        self.axis_threshold
    }

    /// Number of the six directions voting the point occupied
    pub fn votes(&self, point: Vec3) -> usize {
        AxisDirection::ALL
            .iter()
            .filter(|&&dir| self.direction_votes(point, dir))
            .count()
    }

    fn direction_votes(&self, point: Vec3, dir: AxisDirection) -> bool {
        let crossings = self.index.crossings(&dir.ray_from(point));
        let Some(nearest) = crossings.first() else {
            return false;
        };
        if nearest.t <= self.cell_size {
            return true;
        }
        crossings.iter().filter(|c| c.is_crossing()).count() % 2 == 1
    }
}

impl OccupancyClassifier for ParityClassifier<'_> {
    fn classify(&self, point: Vec3) -> Occupancy {
        Occupancy::from_bool(self.votes(point) >= self.axis_threshold as usize)
    }

    fn classify_along(&self, point: Vec3, axis: Axis) -> Occupancy {
        Occupancy::from_bool(
            self.direction_votes(point, AxisDirection::new(axis, true))
                && self.direction_votes(point, AxisDirection::new(axis, false)),
        )
    }

    fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

/// Box overlap against the BVH, with a ray-exit fallback for points away
/// from the surface
pub struct HybridClassifier<'a> {
    index: &'a SpatialIndex,
    cell_size: f32,
}

impl<'a> HybridClassifier<'a> {
    pub fn new(index: &'a SpatialIndex, cell_size: f32) -> Self {
        Self { index, cell_size }
    }

    /// Whether the `2 * cell_size` box around `point` touches the surface
    pub fn near_surface(&self, point: Vec3) -> bool {
        let region = Aabb::from_center_half_extent(point, Vec3::splat(self.cell_size));
        self.index.any_triangle_overlaps(&region)
    }

    /// Whether the nearest real crossing along `dir` leaves the solid.
    /// Grazes are skipped; no crossing at all counts as escaping.
    fn exits_along(&self, point: Vec3, dir: AxisDirection) -> bool {
        self.index
            .crossings(&dir.ray_from(point))
            .iter()
            .find(|c| c.is_crossing())
            .is_some_and(|c| c.kind == CrossingKind::Exit)
    }
}

impl OccupancyClassifier for HybridClassifier<'_> {
    fn classify(&self, point: Vec3) -> Occupancy {
        if self.near_surface(point) {
            return Occupancy::Occupied;
        }
        Occupancy::from_bool(
            Axis::ALL
                .iter()
                .all(|&axis| self.exits_along(point, AxisDirection::new(axis, true))),
        )
    }

    fn classify_along(&self, point: Vec3, axis: Axis) -> Occupancy {
        Occupancy::from_bool(
            self.near_surface(point)
                || (self.exits_along(point, AxisDirection::new(axis, true))
                    && self.exits_along(point, AxisDirection::new(axis, false))),
        )
    }

    fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

/// Classifier selected by `params.strategy`
pub fn classifier_for<'a>(
    index: &'a SpatialIndex,
    params: &ClassificationParams,
) -> Box<dyn OccupancyClassifier + 'a> {
    match params.strategy {
        Strategy::Parity => Box::new(ParityClassifier::new(index, params.cell_size, params.axis_threshold)),
        Strategy::BvhHybrid => Box::new(HybridClassifier::new(index, params.cell_size)),
    }
}

/// Classify a single point with the configured strategy
pub fn classify(point: Vec3, index: &SpatialIndex, params: &ClassificationParams) -> Occupancy {
    classifier_for(index, params).classify(point)
}
