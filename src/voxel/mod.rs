//! Voxel grid, occupancy classification and output

pub mod grid;
pub mod set;
pub mod classifier;
pub mod gap_fill;
pub mod instancing;

pub use grid::{samples, GridCellId, GridLattice, GridSamples, GridSpec, MAX_CELLS};
pub use set::{Voxel, VoxelSet, VoxelTag};
pub use classifier::{classifier_for, classify, HybridClassifier, Occupancy, OccupancyClassifier, ParityClassifier};
pub use gap_fill::{fill_interpolated, gap_candidates, GapFiller};
pub use instancing::{hsl_to_rgb, BoxGeometry, InstanceBuffer, VoxelInstance};
