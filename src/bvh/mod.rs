//! Bounding volume hierarchy over a triangle buffer.
//!
//! Nodes live in one flat array; leaves reference a contiguous range of a
//! permuted triangle order, so every triangle sits in exactly one leaf.
//! Splits are spatial medians along the node's longest axis, falling back
//! to an object median when every centroid lands on one side.

mod builder;

use std::sync::Arc;

use crate::core::{Error, Result};
use crate::math::{Aabb, Ray, Triangle};
use crate::mesh::TriangleBuffer;

use builder::BvhBuilder;

/// Leaf threshold used by [`SpatialIndex::build`]
pub const DEFAULT_LEAF_SIZE: usize = 8;

/// Depth cap; deeper nodes become leaves regardless of size
pub(crate) const MAX_DEPTH: usize = 48;

const STACK_SIZE: usize = MAX_DEPTH + 2;

/// Hits closer than this (relative to `1 + t`) are the same surface point
const MERGE_EPSILON: f32 = 1e-5;

#[derive(Clone, Copy, Debug)]
pub(crate) enum NodeKind {
    Leaf { first: u32, count: u32 },
    Internal { left: u32, right: u32 },
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct BvhNode {
    pub bounds: Aabb,
    pub kind: NodeKind,
}

/// How a ray meets the surface at one distance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossingKind {
    /// Entering the solid
    Enter,
    /// Leaving the solid
    Exit,
    /// Coincident hits of mixed orientation: the ray touches an edge or
    /// vertex on the silhouette without crossing
    Graze,
}

/// One surface crossing along a ray, after merging coincident hits
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crossing {
    pub t: f32,
    pub kind: CrossingKind,
}

impl Crossing {
    /// Grazes do not change inside/outside state
    pub fn is_crossing(&self) -> bool {
        self.kind != CrossingKind::Graze
    }
}

/// Build statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub triangles: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
    pub largest_leaf: usize,
}

/// Read-only BVH shared by all classification workers
#[derive(Debug)]
pub struct SpatialIndex {
    triangles: Arc<TriangleBuffer>,
    nodes: Vec<BvhNode>,
    /// Triangle indices in leaf order
    order: Vec<u32>,
    stats: BvhStats,
}

impl SpatialIndex {
    /// Build with the default leaf threshold
    pub fn build(triangles: impl Into<Arc<TriangleBuffer>>) -> Result<Self> {
        Self::build_with_leaf_size(triangles, DEFAULT_LEAF_SIZE)
    }

    /// Build with a custom leaf threshold (clamped to at least 1)
    pub fn build_with_leaf_size(
        triangles: impl Into<Arc<TriangleBuffer>>,
        leaf_size: usize,
    ) -> Result<Self> {
        let triangles = triangles.into();
        if triangles.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let start = std::time::Instant::now();
        let (nodes, order, stats) = BvhBuilder::new(&triangles, leaf_size.max(1)).build();

        log::debug!(
            "Built BVH: {} triangles, {} nodes, {} leaves, depth {}, largest leaf {} ({:.2}ms)",
            stats.triangles, stats.nodes, stats.leaves, stats.depth, stats.largest_leaf,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self { triangles, nodes, order, stats })
    }

    pub fn triangles(&self) -> &TriangleBuffer {
        &self.triangles
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    /// Visit every triangle whose bounding box intersects `region`.
    ///
    /// The visitor returns `true` to stop the traversal early; the return
    /// value reports whether that happened.
    pub fn query_aabb(&self, region: &Aabb, mut visit: impl FnMut(usize, &Triangle) -> bool) -> bool {
        let triangles = self.triangles.triangles();
        let mut stack = [0u32; STACK_SIZE];
        let mut len = 1;

        while len > 0 {
            len -= 1;
            let node = &self.nodes[stack[len] as usize];
            if !node.bounds.intersects(region) {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { first, count } => {
                    for &tri_index in &self.order[first as usize..(first + count) as usize] {
                        let tri = &triangles[tri_index as usize];
                        if tri.aabb().intersects(region) && visit(tri_index as usize, tri) {
                            return true;
                        }
                    }
                }
                NodeKind::Internal { left, right } => {
                    stack[len] = right;
                    stack[len + 1] = left;
                    len += 2;
                }
            }
        }

        false
    }

    /// Whether any non-degenerate triangle overlaps `region`
    pub fn any_triangle_overlaps(&self, region: &Aabb) -> bool {
        self.query_aabb(region, |_, tri| tri.overlaps_aabb(region))
    }

    /// Every surface crossing along `ray`, nearest first.
    ///
    /// Raw hits within a small distance of each other are merged: a ray
    /// through a shared edge or vertex counts once, and a ray touching the
    /// silhouette (mixed orientations) is reported as a graze.
    pub fn crossings(&self, ray: &Ray) -> Vec<Crossing> {
        let mut hits = Vec::new();
        let triangles = self.triangles.triangles();
        let mut stack = [0u32; STACK_SIZE];
        let mut len = 1;

        while len > 0 {
            len -= 1;
            let node = &self.nodes[stack[len] as usize];
            if ray.intersects_aabb(&node.bounds).is_none() {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { first, count } => {
                    for &tri_index in &self.order[first as usize..(first + count) as usize] {
                        if let Some(hit) = triangles[tri_index as usize].intersect_ray(ray) {
                            hits.push(hit);
                        }
                    }
                }
                NodeKind::Internal { left, right } => {
                    stack[len] = right;
                    stack[len + 1] = left;
                    len += 2;
                }
            }
        }

        hits.sort_by(|a, b| a.t.total_cmp(&b.t));

        let mut crossings: Vec<Crossing> = Vec::with_capacity(hits.len());
        let mut group_start = 0.0f32;
        for hit in hits {
            let kind = if hit.exiting { CrossingKind::Exit } else { CrossingKind::Enter };
            match crossings.last_mut() {
                Some(last) if hit.t - group_start <= MERGE_EPSILON * (1.0 + group_start.abs()) => {
                    if last.kind != kind {
                        last.kind = CrossingKind::Graze;
                    }
                }
                _ => {
                    group_start = hit.t;
                    crossings.push(Crossing { t: hit.t, kind });
                }
            }
        }

        crossings
    }

    /// Leaf triangle ranges, for invariant checks
    #[cfg(test)]
    pub(crate) fn leaf_triangles(&self) -> Vec<Vec<u32>> {
        self.nodes
            .iter()
            .filter_map(|node| match node.kind {
                NodeKind::Leaf { first, count } => {
                    Some(self.order[first as usize..(first + count) as usize].to_vec())
                }
                NodeKind::Internal { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::math::AxisDirection;
    use crate::mesh::{extract, primitives};

    fn cube_index(half: f32) -> SpatialIndex {
        let (buffer, _) = extract(&primitives::cuboid(Vec3::splat(-half), Vec3::splat(half))).unwrap();
        SpatialIndex::build(buffer).unwrap()
    }

    /// Grid of small closed cubes: many triangles, spread out
    fn cube_field(n: usize) -> TriangleBuffer {
        let mut mesh = crate::mesh::Mesh::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    let min = Vec3::new(x as f32, y as f32, z as f32) * 2.0;
                    mesh.push(primitives::cuboid(min, min + Vec3::ONE));
                }
            }
        }
        extract(&mesh).unwrap().0
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let empty = TriangleBuffer::from_triangles(Vec::new());
        assert!(matches!(SpatialIndex::build(empty), Err(Error::EmptyIndex)));
    }

    #[test]
    fn test_every_triangle_in_exactly_one_leaf() {
        let buffer = cube_field(4);
        let count = buffer.len();
        let index = SpatialIndex::build(buffer).unwrap();

        let mut seen = vec![0u32; count];
        for leaf in index.leaf_triangles() {
            assert!(!leaf.is_empty());
            assert!(leaf.len() <= DEFAULT_LEAF_SIZE);
            for tri in leaf {
                seen[tri as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));

        let stats = index.stats();
        assert_eq!(stats.triangles, count);
        assert_eq!(stats.nodes, 2 * stats.leaves - 1);
        assert!(stats.depth < 16);
    }

    #[test]
    fn test_node_bounds_contain_children() {
        let index = SpatialIndex::build(cube_field(3)).unwrap();
        for node in &index.nodes {
            if let NodeKind::Internal { left, right } = node.kind {
                let children = index.nodes[left as usize].bounds.merged(&index.nodes[right as usize].bounds);
                assert_eq!(children, node.bounds);
            }
        }
    }

    #[test]
    fn test_identical_triangles_still_split() {
        let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y);
        let buffer = TriangleBuffer::from_triangles(vec![tri; 100]);
        let index = SpatialIndex::build(buffer).unwrap();
        assert!(index.stats().largest_leaf <= DEFAULT_LEAF_SIZE);
        assert_eq!(index.leaf_triangles().iter().map(Vec::len).sum::<usize>(), 100);
    }

    #[test]
    fn test_query_aabb_matches_brute_force() {
        let buffer = cube_field(4);
        let region = Aabb::new(Vec3::new(1.5, 1.5, 1.5), Vec3::new(4.5, 2.5, 4.5));
        let expected: Vec<usize> = buffer
            .triangles()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.aabb().intersects(&region))
            .map(|(i, _)| i)
            .collect();

        let index = SpatialIndex::build(buffer).unwrap();
        let mut found = Vec::new();
        let stopped = index.query_aabb(&region, |i, _| {
            found.push(i);
            false
        });
        found.sort_unstable();
        assert!(!stopped);
        assert_eq!(found, expected);
    }

    #[test]
    fn test_any_triangle_overlaps() {
        let index = cube_index(1.0);
        // Straddles the +X face
        assert!(index.any_triangle_overlaps(&Aabb::from_center_half_extent(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(0.1))));
        // Deep inside, touches nothing
        assert!(!index.any_triangle_overlaps(&Aabb::from_center_half_extent(Vec3::ZERO, Vec3::splat(0.5))));
        // Far outside
        assert!(!index.any_triangle_overlaps(&Aabb::from_center_half_extent(Vec3::splat(5.0), Vec3::splat(0.5))));
    }

    #[test]
    fn test_crossings_from_inside_and_outside() {
        let index = cube_index(1.0);

        let inside = index.crossings(&AxisDirection::ALL[0].ray_from(Vec3::new(0.2, 0.3, 0.1)));
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].kind, CrossingKind::Exit);
        assert!((inside[0].t - 0.8).abs() < 1e-5);

        let outside = index.crossings(&Ray::new(Vec3::new(-3.0, 0.3, 0.1), Vec3::X));
        let kinds: Vec<CrossingKind> = outside.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CrossingKind::Enter, CrossingKind::Exit]);
    }

    #[test]
    fn test_diagonal_edge_counts_once() {
        // y == z runs along the diagonal shared by both triangles of each X face
        let index = cube_index(1.0);
        let crossings = index.crossings(&Ray::new(Vec3::new(0.0, 0.25, 0.25), Vec3::X));
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].kind, CrossingKind::Exit);
    }

    #[test]
    fn test_silhouette_vertex_is_a_graze() {
        // Passes through the octahedron's +Y vertex without entering it
        let (buffer, _) = extract(&primitives::octahedron(1.0)).unwrap();
        let index = SpatialIndex::build(buffer).unwrap();
        let crossings = index.crossings(&Ray::new(Vec3::new(-3.0, 1.0, 0.0), Vec3::X));
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].kind, CrossingKind::Graze);
        assert!(!crossings[0].is_crossing());
    }
}
