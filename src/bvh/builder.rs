//! Top-down BVH construction

use crate::core::types::Vec3;
use crate::math::Aabb;
use crate::mesh::TriangleBuffer;

use super::{BvhNode, BvhStats, NodeKind, MAX_DEPTH};

pub(super) struct BvhBuilder {
    tri_bounds: Vec<Aabb>,
    centroids: Vec<Vec3>,
    order: Vec<u32>,
    nodes: Vec<BvhNode>,
    leaf_size: usize,
    stats: BvhStats,
}

impl BvhBuilder {
    pub fn new(triangles: &TriangleBuffer, leaf_size: usize) -> Self {
        let tri_bounds: Vec<Aabb> = triangles.triangles().iter().map(|t| t.aabb()).collect();
        let centroids = tri_bounds.iter().map(Aabb::center).collect();
        let count = tri_bounds.len();

        Self {
            tri_bounds,
            centroids,
            order: (0..count as u32).collect(),
            nodes: Vec::with_capacity(2 * count.div_ceil(leaf_size)),
            leaf_size,
            stats: BvhStats { triangles: count, ..Default::default() },
        }
    }

    pub fn build(mut self) -> (Vec<BvhNode>, Vec<u32>, BvhStats) {
        let count = self.order.len();
        self.build_node(0, count, 0);
        self.stats.nodes = self.nodes.len();
        (self.nodes, self.order, self.stats)
    }

    /// Build the subtree over `order[start..end]`, returning its node index
    fn build_node(&mut self, start: usize, end: usize, depth: usize) -> u32 {
        let bounds = self.order[start..end]
            .iter()
            .fold(Aabb::empty(), |acc, &i| acc.merged(&self.tri_bounds[i as usize]));

        let node_index = self.nodes.len() as u32;
        let count = end - start;
        self.stats.depth = self.stats.depth.max(depth);

        if count <= self.leaf_size || depth >= MAX_DEPTH {
            self.nodes.push(BvhNode {
                bounds,
                kind: NodeKind::Leaf { first: start as u32, count: count as u32 },
            });
            self.stats.leaves += 1;
            self.stats.largest_leaf = self.stats.largest_leaf.max(count);
            return node_index;
        }

        // Placeholder, patched once both children exist
        self.nodes.push(BvhNode {
            bounds,
            kind: NodeKind::Internal { left: 0, right: 0 },
        });

        let mid = self.split(start, end, &bounds);
        let left = self.build_node(start, mid, depth + 1);
        let right = self.build_node(mid, end, depth + 1);
        self.nodes[node_index as usize].kind = NodeKind::Internal { left, right };

        node_index
    }

    /// Partition `order[start..end]` and return the split point; both halves
    /// are non-empty.
    fn split(&mut self, start: usize, end: usize, bounds: &Aabb) -> usize {
        let axis = bounds.longest_axis();
        let pivot = bounds.center()[axis];

        let centroids = &self.centroids;
        let slice = &mut self.order[start..end];

        // Spatial median
        let mut left = 0;
        for i in 0..slice.len() {
            if centroids[slice[i] as usize][axis] < pivot {
                slice.swap(i, left);
                left += 1;
            }
        }

        if left > 0 && left < slice.len() {
            return start + left;
        }

        // Everything on one side: object median
        slice.sort_unstable_by(|&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });
        start + slice.len() / 2
    }
}
