//! Row repair pass.
//!
//! Occupied voxels are grouped into rows along a scan axis. Wherever two
//! neighbouring voxels of a row are more than one cell apart, the cells
//! between them are candidates: they are either re-tested with the
//! classifier restricted to the scan axis, or (in interpolation mode)
//! accepted when they are bracketed along all three axes.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::math::Axis;
use crate::pipeline::progress::{NoProgress, Phase, ProgressObserver, ProgressTracker};
use super::classifier::OccupancyClassifier;
use super::grid::GridCellId;
use super::set::{VoxelSet, VoxelTag};

/// Cells lying strictly between two occupied cells of the same row along
/// `axis`, row by row
pub fn gap_candidates(set: &VoxelSet, axis: Axis) -> Vec<GridCellId> {
    // Row key: the id with its scan coordinate zeroed
    let mut rows: BTreeMap<GridCellId, Vec<i32>> = BTreeMap::new();
    for id in set.cell_ids() {
        rows.entry(id.with(axis, 0)).or_default().push(id.get(axis));
    }

    let mut candidates = Vec::new();
    for (row, coords) in rows {
        // Set order is lexicographic, so fixed-row coords already ascend
        debug_assert!(coords.windows(2).all(|w| w[0] < w[1]));
        for pair in coords.windows(2) {
            candidates.extend((pair[0] + 1..pair[1]).map(|c| row.with(axis, c)));
        }
    }
    candidates
}

/// Re-classifies gap cells with a shared classifier
pub struct GapFiller<'a> {
    classifier: &'a dyn OccupancyClassifier,
    batch_size: usize,
}

impl<'a> GapFiller<'a> {
    pub fn new(classifier: &'a dyn OccupancyClassifier) -> Self {
        Self {
            classifier,
            batch_size: 4096,
        }
    }

    /// Candidates per worker batch (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// One pass along `axis`. The input is left untouched; the result holds
    /// every input voxel plus the gap cells found occupied.
    pub fn fill(&self, set: &VoxelSet, axis: Axis) -> VoxelSet {
        self.fill_with_progress(set, axis, &NoProgress)
    }

    /// Like [`fill`](Self::fill), reporting per-batch progress
    pub fn fill_with_progress(
        &self,
        set: &VoxelSet,
        axis: Axis,
        observer: &dyn ProgressObserver,
    ) -> VoxelSet {
        let mut filled = set.clone();
        let candidates = gap_candidates(set, axis);
        if candidates.is_empty() {
            return filled;
        }

        let spec = set.spec();
        let tracker = ProgressTracker::new(Phase::GapFill(axis), candidates.len(), observer);
        let found: Vec<GridCellId> = candidates
            .par_chunks(self.batch_size)
            .flat_map_iter(|batch| {
                let hits: Vec<GridCellId> = batch
                    .iter()
                    .copied()
                    .filter(|&id| self.classifier.classify_along(spec.center_of(id), axis).is_occupied())
                    .collect();
                tracker.advance(batch.len());
                hits
            })
            .collect();

        log::debug!(
            "Gap fill along {:?}: {} candidates, {} filled",
            axis,
            candidates.len(),
            found.len()
        );
        filled.extend(found.into_iter().map(|id| (id, VoxelTag::GapFilled)));
        filled
    }
}

/// Add every cell that is a gap candidate along all three axes at once.
/// No classification is performed.
pub fn fill_interpolated(set: &VoxelSet) -> VoxelSet {
    let along_y: BTreeSet<GridCellId> = gap_candidates(set, Axis::Y).into_iter().collect();
    let along_z: BTreeSet<GridCellId> = gap_candidates(set, Axis::Z).into_iter().collect();

    let mut filled = set.clone();
    let before = filled.count();
    filled.extend(
        gap_candidates(set, Axis::X)
            .into_iter()
            .filter(|id| along_y.contains(id) && along_z.contains(id))
            .map(|id| (id, VoxelTag::GapFilled)),
    );
    log::debug!("Interpolated gap fill added {} cells", filled.count() - before);
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::SpatialIndex;
    use crate::core::types::Vec3;
    use crate::mesh::{extract, primitives, IndexedMesh};
    use crate::voxel::classifier::{HybridClassifier, Occupancy};
    use crate::voxel::grid::{GridLattice, GridSpec};

    fn spec() -> GridSpec {
        GridSpec::new(Vec3::ZERO, 1.0).unwrap()
    }

    /// Classifier that accepts everything
    struct Always;

    impl OccupancyClassifier for Always {
        fn classify(&self, _point: Vec3) -> Occupancy {
            Occupancy::Occupied
        }
        fn classify_along(&self, _point: Vec3, _axis: Axis) -> Occupancy {
            Occupancy::Occupied
        }
        fn cell_size(&self) -> f32 {
            1.0
        }
    }

    #[test]
    fn test_candidates_between_row_endpoints() {
        let mut set = VoxelSet::new(spec());
        set.extend([
            (GridCellId::new(0, 2, 3), VoxelTag::Classified),
            (GridCellId::new(4, 2, 3), VoxelTag::Classified),
            (GridCellId::new(5, 2, 3), VoxelTag::Classified),
            // Single voxel row: nothing to bracket
            (GridCellId::new(1, 0, 0), VoxelTag::Classified),
        ]);
        assert_eq!(
            gap_candidates(&set, Axis::X),
            vec![GridCellId::new(1, 2, 3), GridCellId::new(2, 2, 3), GridCellId::new(3, 2, 3)]
        );
        assert!(gap_candidates(&set, Axis::Y).is_empty());
    }

    #[test]
    fn test_fill_does_not_mutate_input_and_is_idempotent() {
        let mut set = VoxelSet::new(spec());
        set.insert(GridCellId::new(2, -1, 0), VoxelTag::Classified);
        set.insert(GridCellId::new(2, -1, 9), VoxelTag::Classified);

        let filler = GapFiller::new(&Always).with_batch_size(3);
        let once = filler.fill(&set, Axis::Z);
        assert_eq!(set.count(), 2);
        assert_eq!(once.count(), 10);
        assert_eq!(once.count_tagged(VoxelTag::GapFilled), 8);

        let twice = filler.fill(&once, Axis::Z);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_fill_reports_progress() {
        let mut set = VoxelSet::new(spec());
        set.insert(GridCellId::new(0, 0, 0), VoxelTag::Classified);
        set.insert(GridCellId::new(0, 11, 0), VoxelTag::Classified);

        let last = std::sync::Mutex::new(0usize);
        let observer = |p: crate::pipeline::progress::Progress| {
            assert_eq!(p.phase, Phase::GapFill(Axis::Y));
            assert_eq!(p.total, 10);
            let mut last = last.lock().unwrap();
            *last = (*last).max(p.completed);
        };
        GapFiller::new(&Always).with_batch_size(4).fill_with_progress(&set, Axis::Y, &observer);
        assert_eq!(*last.lock().unwrap(), 10);
    }

    #[test]
    fn test_open_box_rows_are_repaired() {
        // Cube with its +Y face removed: interior rays along +Y escape
        let cube = primitives::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut indices = cube.indices.clone().unwrap();
        indices.drain(18..24);
        let open = IndexedMesh::new(cube.positions.clone(), indices);

        let (buffer, bounds) = extract(&open).unwrap();
        let index = SpatialIndex::build(buffer).unwrap();
        let classifier = HybridClassifier::new(&index, 0.25);

        let lattice = GridLattice::covering(&bounds, 0.25, 0).unwrap();
        let spec = lattice.spec();
        let mut set = VoxelSet::new(spec);
        for id in lattice.iter() {
            if classifier.classify(spec.center_of(id)).is_occupied() {
                set.insert(id, VoxelTag::Classified);
            }
        }
        assert!(set.count() < 512);

        let filler = GapFiller::new(&classifier);
        let filled = filler.fill(&set, Axis::X);
        assert_eq!(filled.count(), 512);
        assert_eq!(filled.count_tagged(VoxelTag::GapFilled), 512 - set.count());
        assert_eq!(filler.fill(&filled, Axis::X), filled);
    }

    #[test]
    fn test_interpolation_fills_closed_shell() {
        let mut shell = VoxelSet::new(spec());
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..5 {
                    if [i, j, k].iter().any(|&c| c == 0 || c == 4) {
                        shell.insert(GridCellId::new(i, j, k), VoxelTag::Classified);
                    }
                }
            }
        }
        assert_eq!(shell.count(), 125 - 27);

        let filled = fill_interpolated(&shell);
        assert_eq!(filled.count(), 125);
        assert_eq!(filled.count_tagged(VoxelTag::GapFilled), 27);
        assert_eq!(fill_interpolated(&filled), filled);
    }

    #[test]
    fn test_interpolation_needs_all_three_axes() {
        // Two walls bracket along X only
        let mut set = VoxelSet::new(spec());
        for j in 0..3 {
            for k in 0..3 {
                set.insert(GridCellId::new(0, j, k), VoxelTag::Classified);
                set.insert(GridCellId::new(4, j, k), VoxelTag::Classified);
            }
        }
        assert_eq!(fill_interpolated(&set), set);
    }
}
