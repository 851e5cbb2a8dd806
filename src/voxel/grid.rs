//! Grid cells and lattice enumeration.
//!
//! Cells are keyed by integer ids derived from
//! `floor((point - origin) / cell_size)`, never by float positions, so the
//! same world point always lands in the same cell.

use crate::core::{Error, Result};
use crate::core::types::Vec3;
use crate::math::{Aabb, Axis};

/// Extent ratios within this of a whole number snap down, so a box exactly
/// `n` cells wide yields `n` cells rather than `n + 1`
const EXTENT_SNAP: f32 = 1e-4;

/// Upper bound on lattice size
pub const MAX_CELLS: usize = 1 << 30;

/// Integer lattice coordinate of a cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCellId {
    pub i: i32,
    pub j: i32,
    pub k: i32,
}

impl GridCellId {
    pub const fn new(i: i32, j: i32, k: i32) -> Self {
        Self { i, j, k }
    }

    /// Coordinate along `axis`
    pub fn get(self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.i,
            Axis::Y => self.j,
            Axis::Z => self.k,
        }
    }

    /// Copy with the coordinate along `axis` replaced
    pub fn with(self, axis: Axis, value: i32) -> Self {
        let mut id = self;
        match axis {
            Axis::X => id.i = value,
            Axis::Y => id.j = value,
            Axis::Z => id.k = value,
        }
        id
    }
}

/// Origin and cell size shared by all ids of one voxelization
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpec {
    pub origin: Vec3,
    pub cell_size: f32,
}

impl GridSpec {
    pub fn new(origin: Vec3, cell_size: f32) -> Result<Self> {
        validate_cell_size(cell_size)?;
        if !origin.is_finite() {
            return Err(Error::InvalidConfiguration("grid origin must be finite".into()));
        }
        Ok(Self { origin, cell_size })
    }

    /// Cell containing `point`
    pub fn cell_of(&self, point: Vec3) -> GridCellId {
        let rel = ((point - self.origin) / self.cell_size).floor();
        GridCellId::new(rel.x as i32, rel.y as i32, rel.z as i32)
    }

    /// World-space center of a cell
    pub fn center_of(&self, id: GridCellId) -> Vec3 {
        self.origin
            + Vec3::new(
                id.i as f32 + 0.5,
                id.j as f32 + 0.5,
                id.k as f32 + 0.5,
            ) * self.cell_size
    }
}

pub(crate) fn validate_cell_size(cell_size: f32) -> Result<()> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(Error::InvalidConfiguration(format!(
            "cell size must be a finite value > 0, got {cell_size}"
        )));
    }
    Ok(())
}

/// Finite block of cells covering a bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLattice {
    spec: GridSpec,
    min: GridCellId,
    dims: [usize; 3],
}

impl GridLattice {
    /// Lattice over `bounds`, grown by `padding` cells on every side.
    /// Cell ids are relative to `bounds.min`; padding cells get negative ids.
    pub fn covering(bounds: &Aabb, cell_size: f32, padding: u32) -> Result<Self> {
        validate_cell_size(cell_size)?;
        if !bounds.is_valid() || !bounds.min.is_finite() || !bounds.max.is_finite() {
            return Err(Error::InvalidGeometry("bounding box is empty or not finite".into()));
        }

        let pad = padding as usize;
        let size = bounds.size();
        let mut dims = [0usize; 3];
        for axis in 0..3 {
            let cells = (size[axis] / cell_size - EXTENT_SNAP).ceil().max(1.0);
            if cells > MAX_CELLS as f32 {
                return Err(too_large());
            }
            dims[axis] = cells as usize + 2 * pad;
        }

        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&n| n <= MAX_CELLS)
            .ok_or_else(too_large)?;
        log::debug!("Lattice {}x{}x{} = {} cells at {}", dims[0], dims[1], dims[2], total, cell_size);

        let p = -(padding as i32);
        Ok(Self {
            spec: GridSpec { origin: bounds.min, cell_size },
            min: GridCellId::new(p, p, p),
            dims,
        })
    }

    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// Cells per axis
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Lowest cell id (inclusive)
    pub fn min(&self) -> GridCellId {
        self.min
    }

    /// Highest cell id (inclusive)
    pub fn max(&self) -> GridCellId {
        GridCellId::new(
            self.min.i + self.dims[0] as i32 - 1,
            self.min.j + self.dims[1] as i32 - 1,
            self.min.k + self.dims[2] as i32 - 1,
        )
    }

    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: GridCellId) -> bool {
        let max = self.max();
        (self.min.i..=max.i).contains(&id.i)
            && (self.min.j..=max.j).contains(&id.j)
            && (self.min.k..=max.k).contains(&id.k)
    }

    /// Cell at row-major position `linear` (i slowest, k fastest)
    pub fn cell_at(&self, linear: usize) -> GridCellId {
        let [_, ny, nz] = self.dims;
        let i = linear / (ny * nz);
        let j = (linear / nz) % ny;
        let k = linear % nz;
        GridCellId::new(
            self.min.i + i as i32,
            self.min.j + j as i32,
            self.min.k + k as i32,
        )
    }

    /// Restartable row-major enumeration
    pub fn iter(&self) -> GridSamples {
        GridSamples { lattice: *self, next: 0 }
    }
}

fn too_large() -> Error {
    Error::InvalidConfiguration(format!(
        "grid exceeds {MAX_CELLS} cells; increase the cell size"
    ))
}

/// Lazy row-major sequence of lattice cells
#[derive(Clone, Debug)]
pub struct GridSamples {
    lattice: GridLattice,
    next: usize,
}

impl GridSamples {
    pub fn lattice(&self) -> &GridLattice {
        &self.lattice
    }
}

impl Iterator for GridSamples {
    type Item = GridCellId;

    fn next(&mut self) -> Option<GridCellId> {
        if self.next >= self.lattice.len() {
            return None;
        }
        let id = self.lattice.cell_at(self.next);
        self.next += 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.lattice.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridSamples {}

/// Enumerate the cells covering `bounds` (optionally padded)
pub fn samples(bounds: &Aabb, cell_size: f32, padding: u32) -> Result<GridSamples> {
    Ok(GridLattice::covering(bounds, cell_size, padding)?.iter())
}
