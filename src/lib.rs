//! Meshvox - triangle mesh voxelization
//!
//! Turns an arbitrary triangle mesh into the set of uniform grid cells that
//! lie inside or on its surface, using a BVH-accelerated occupancy test and
//! a row gap-filling repair pass, and emits per-instance box data for a
//! renderer.

pub mod core;
pub mod math;
pub mod mesh;
pub mod bvh;
pub mod voxel;
pub mod pipeline;

pub use crate::core::{Error, Result};
pub use mesh::{IndexedMesh, Mesh, MeshSource};
pub use pipeline::{voxelize, ClassificationParams, PreparedMesh, Strategy, Voxelizer, VoxelizerConfig};
pub use voxel::{InstanceBuffer, VoxelSet};
