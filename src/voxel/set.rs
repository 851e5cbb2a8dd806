//! De-duplicated voxel container

use std::collections::BTreeMap;

use crate::core::types::Vec3;
use super::grid::{GridCellId, GridSpec};

/// How a voxel entered the set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VoxelTag {
    /// Found occupied by the classifier
    #[default]
    Classified,
    /// Added by the gap-filling repair pass
    GapFilled,
}

/// An occupied grid cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voxel {
    pub id: GridCellId,
    /// World-space cell center
    pub center: Vec3,
    pub tag: VoxelTag,
    /// Explicit linear RGB tint; `None` uses the palette color for `tag`
    pub color: Option<[f32; 3]>,
}

/// Voxels keyed by cell id.
///
/// Iteration follows row-major cell order (i, then j, then k), so two runs
/// over the same input iterate identically regardless of worker scheduling.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelSet {
    spec: GridSpec,
    voxels: BTreeMap<GridCellId, Voxel>,
}

impl VoxelSet {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            voxels: BTreeMap::new(),
        }
    }

    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// Insert a cell; returns false (and keeps the existing voxel) when the
    /// cell is already present
    pub fn insert(&mut self, id: GridCellId, tag: VoxelTag) -> bool {
        let center = self.spec.center_of(id);
        self.insert_voxel(Voxel { id, center, tag, color: None })
    }

    /// Insert a prepared voxel; a no-op when its cell is already present
    pub fn insert_voxel(&mut self, voxel: Voxel) -> bool {
        match self.voxels.entry(voxel.id) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(voxel);
                true
            }
        }
    }

    /// Insert the cell containing a world point, returning its id
    pub fn insert_point(&mut self, point: Vec3, tag: VoxelTag) -> GridCellId {
        let id = self.spec.cell_of(point);
        self.insert(id, tag);
        id
    }

    /// Tint an existing voxel; returns false when the cell is absent
    pub fn set_color(&mut self, id: GridCellId, color: [f32; 3]) -> bool {
        match self.voxels.get_mut(&id) {
            Some(voxel) => {
                voxel.color = Some(color);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: GridCellId) -> bool {
        self.voxels.contains_key(&id)
    }

    pub fn get(&self, id: GridCellId) -> Option<&Voxel> {
        self.voxels.get(&id)
    }

    pub fn count(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voxel> {
        self.voxels.values()
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = GridCellId> + '_ {
        self.voxels.keys().copied()
    }

    /// Number of voxels carrying `tag`
    pub fn count_tagged(&self, tag: VoxelTag) -> usize {
        self.iter().filter(|v| v.tag == tag).count()
    }
}

impl Extend<(GridCellId, VoxelTag)> for VoxelSet {
    fn extend<T: IntoIterator<Item = (GridCellId, VoxelTag)>>(&mut self, iter: T) {
        for (id, tag) in iter {
            self.insert(id, tag);
        }
    }
}
