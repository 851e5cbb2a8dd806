//! End-to-end voxelization.
//!
//! The stages run strictly in order: geometry extraction, BVH build, lattice
//! sampling with parallel classification, then the gap-fill passes (X, Y, Z)
//! which need the complete first-pass result. Classification batches run on
//! a dedicated rayon pool; each batch collects its own hits and the batches
//! are merged in lattice order, so results do not depend on scheduling.

pub mod config;
pub mod progress;

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::bvh::SpatialIndex;
use crate::core::{Error, Result};
use crate::math::{Aabb, Axis};
use crate::mesh::{extract, MeshSource, TriangleBuffer};
use crate::voxel::classifier::classifier_for;
use crate::voxel::gap_fill::{fill_interpolated, GapFiller};
use crate::voxel::grid::{GridCellId, GridLattice};
use crate::voxel::instancing::InstanceBuffer;
use crate::voxel::set::{VoxelSet, VoxelTag};

pub use config::{ClassificationParams, GapFillMode, RenderParams, Strategy, VoxelizerConfig, WorkerConfig};
pub use progress::{NoProgress, Phase, Progress, ProgressObserver};

use progress::ProgressTracker;

/// A mesh flattened to world space with its BVH, reusable across runs with
/// different parameters
#[derive(Debug)]
pub struct PreparedMesh {
    triangles: Arc<TriangleBuffer>,
    bounds: Aabb,
    /// `None` when the triangles enclose no volume
    index: Option<SpatialIndex>,
}

impl PreparedMesh {
    pub fn new<M: MeshSource + ?Sized>(mesh: &M) -> Result<Self> {
        let (buffer, bounds) = extract(mesh)?;
        let triangles = Arc::new(buffer);

        let index = if triangles.encloses_volume() {
            Some(SpatialIndex::build(Arc::clone(&triangles))?)
        } else {
            log::warn!(
                "Mesh with {} triangles is planar or degenerate; it encloses no volume",
                triangles.len()
            );
            None
        };

        Ok(Self { triangles, bounds, index })
    }

    pub fn triangles(&self) -> &TriangleBuffer {
        &self.triangles
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn index(&self) -> Option<&SpatialIndex> {
        self.index.as_ref()
    }

    pub fn encloses_volume(&self) -> bool {
        self.index.is_some()
    }
}

/// Runs voxelizations on its own worker pool
pub struct Voxelizer {
    pool: rayon::ThreadPool,
    batch_size: usize,
}

impl Voxelizer {
    pub fn new(workers: &WorkerConfig) -> Result<Self> {
        workers.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.threads)
            .thread_name(|i| format!("voxelize-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        log::debug!(
            "Voxelizer pool: {} threads, batches of {}",
            pool.current_num_threads(),
            workers.batch_size
        );
        Ok(Self {
            pool,
            batch_size: workers.batch_size,
        })
    }

    pub fn from_config(config: &VoxelizerConfig) -> Result<Self> {
        config.validate()?;
        Self::new(&config.workers)
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn voxelize<M: MeshSource + ?Sized>(
        &self,
        mesh: &M,
        params: &ClassificationParams,
    ) -> Result<VoxelSet> {
        self.voxelize_with_progress(mesh, params, &NoProgress)
    }

    pub fn voxelize_with_progress<M: MeshSource + ?Sized>(
        &self,
        mesh: &M,
        params: &ClassificationParams,
        observer: &dyn ProgressObserver,
    ) -> Result<VoxelSet> {
        params.validate()?;
        let prepared = PreparedMesh::new(mesh)?;
        self.voxelize_prepared(&prepared, params, observer)
    }

    /// Classify, then optionally gap-fill, the lattice covering `prepared`
    pub fn voxelize_prepared(
        &self,
        prepared: &PreparedMesh,
        params: &ClassificationParams,
        observer: &dyn ProgressObserver,
    ) -> Result<VoxelSet> {
        params.validate()?;
        let lattice = GridLattice::covering(&prepared.bounds, params.cell_size, params.padding)?;
        let Some(index) = prepared.index() else {
            return Ok(VoxelSet::new(lattice.spec()));
        };

        let start = Instant::now();
        let classifier = classifier_for(index, params);
        let batch_size = self.batch_size;

        let set = self.pool.install(|| {
            let spec = lattice.spec();
            let total = lattice.len();
            let tracker = ProgressTracker::new(progress::Phase::Classify, total, observer);

            let occupied: Vec<GridCellId> = (0..total.div_ceil(batch_size))
                .into_par_iter()
                .flat_map_iter(|batch| {
                    let first = batch * batch_size;
                    let end = (first + batch_size).min(total);
                    let hits: Vec<GridCellId> = (first..end)
                        .map(|linear| lattice.cell_at(linear))
                        .filter(|&id| classifier.classify(spec.center_of(id)).is_occupied())
                        .collect();
                    tracker.advance(end - first);
                    hits
                })
                .collect();

            let mut set = VoxelSet::new(spec);
            set.extend(occupied.into_iter().map(|id| (id, VoxelTag::Classified)));
            log::debug!("Classified {} of {} lattice points as occupied", set.count(), total);

            if params.gap_fill {
                set = match params.gap_fill_mode {
                    GapFillMode::Reclassify => {
                        let filler = GapFiller::new(&*classifier).with_batch_size(batch_size);
                        Axis::ALL
                            .iter()
                            .fold(set, |set, &axis| filler.fill_with_progress(&set, axis, observer))
                    }
                    GapFillMode::Interpolate => fill_interpolated(&set),
                };
            }
            set
        });

        log::info!(
            "Voxelized {} triangles at cell size {}: {} voxels ({} gap-filled) in {:.2}ms",
            prepared.triangles.len(),
            params.cell_size,
            set.count(),
            set.count_tagged(VoxelTag::GapFilled),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(set)
    }
}

/// Voxelize on a default-sized worker pool
pub fn voxelize<M: MeshSource + ?Sized>(mesh: &M, params: &ClassificationParams) -> Result<VoxelSet> {
    Voxelizer::new(&WorkerConfig::default())?.voxelize(mesh, params)
}

/// Instance data for `set` with the configured box shape
pub fn instance_buffer(set: &VoxelSet, render: &RenderParams) -> Result<InstanceBuffer> {
    InstanceBuffer::build(set, render.box_size, render.roundness)
}
