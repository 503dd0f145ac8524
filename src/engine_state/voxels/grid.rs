//! # Voxel Grid
//!
//! A cubic grid of [`ColorCell`]s with side length `N`.
//!
//! ## Storage
//!
//! Cells live in a flat vector indexed `x + N * (y + N * z)`. Next to it, an
//! occupancy bit vector keeps one bit per cell so solidity checks (used on
//! every neighbor lookup while meshing) and occupancy set algebra (used by the
//! challenge comparison) never have to inspect the cell values:
//! - `cells`: N³ entries, `ColorCell::Empty` for air
//! - `occupancy`: N³ bits, set where the cell is solid
//!
//! The two are kept in lockstep by every mutating method.

use std::mem;

use bitvec::prelude::{BitSlice, BitVec};
use log::warn;

use super::color_cell::ColorCell;
use crate::core::errors::WorkerError;

static EMPTY_CELL: ColorCell = ColorCell::Empty;

/// A cubic voxel grid.
///
/// Reads outside the grid return `Empty`; the grid is never resized in place,
/// a different side length needs a new grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    size: usize,
    cells: Vec<ColorCell>,
    occupancy: BitVec,
}

impl VoxelGrid {
    /// Allocates an all-empty grid.
    ///
    /// # Arguments
    /// * `size` - Side length `N`; must be at least 1
    ///
    /// # Returns
    /// The grid, or `WorkerError::InvalidGridSize` when `size` is zero, `N³`
    /// cells overflow the address space, or the allocation fails
    pub fn new(size: usize) -> Result<Self, WorkerError> {
        let cell_count = size
            .checked_mul(size)
            .and_then(|plane| plane.checked_mul(size))
            .filter(|count| *count > 0)
            .ok_or(WorkerError::InvalidGridSize(size))?;
        cell_count
            .checked_mul(mem::size_of::<ColorCell>())
            .filter(|bytes| *bytes <= isize::MAX as usize)
            .ok_or(WorkerError::InvalidGridSize(size))?;

        let mut cells = Vec::new();
        cells.try_reserve_exact(cell_count).map_err(|err| {
            warn!("Could not allocate {cell_count} cells: {err}");
            WorkerError::InvalidGridSize(size)
        })?;
        cells.resize(cell_count, ColorCell::Empty);

        Ok(Self {
            size,
            cells,
            occupancy: BitVec::repeat(false, cell_count),
        })
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells, `N³`.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.size * (y + self.size * z)
    }

    #[inline]
    fn checked_index(&self, x: i64, y: i64, z: i64) -> Option<usize> {
        let n = self.size as i64;
        if (0..n).contains(&x) && (0..n).contains(&y) && (0..n).contains(&z) {
            Some(self.index(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    /// Coordinates of the cell stored at flat `index`.
    pub fn coordinates_of(&self, index: usize) -> (usize, usize, usize) {
        let x = index % self.size;
        let y = (index / self.size) % self.size;
        let z = index / (self.size * self.size);
        (x, y, z)
    }

    /// Reads a cell. Out-of-range coordinates read as `Empty`.
    pub fn get(&self, x: i64, y: i64, z: i64) -> &ColorCell {
        match self.checked_index(x, y, z) {
            Some(index) => &self.cells[index],
            None => &EMPTY_CELL,
        }
    }

    /// Whether the cell holds a voxel. Out-of-range coordinates are never solid.
    #[inline]
    pub fn is_solid(&self, x: i64, y: i64, z: i64) -> bool {
        self.checked_index(x, y, z)
            .map(|index| self.occupancy[index])
            .unwrap_or(false)
    }

    /// Writes a cell.
    ///
    /// # Returns
    /// `false` (and no change) when the coordinates are outside the grid
    pub fn set(&mut self, x: usize, y: usize, z: usize, cell: ColorCell) -> bool {
        if x >= self.size || y >= self.size || z >= self.size {
            return false;
        }
        let index = self.index(x, y, z);
        self.occupancy.set(index, cell.is_solid());
        self.cells[index] = cell;
        true
    }

    /// Resets every cell to `Empty`.
    pub fn clear(&mut self) {
        self.cells.fill(ColorCell::Empty);
        self.occupancy.fill(false);
    }

    /// Replaces this grid's contents with a previously taken snapshot.
    ///
    /// A snapshot of a different side length replaces the grid wholesale.
    pub fn restore_from(&mut self, snapshot: &VoxelGrid) {
        if snapshot.size != self.size {
            *self = snapshot.clone();
            return;
        }
        self.cells.clone_from_slice(&snapshot.cells);
        self.occupancy.copy_from_bitslice(&snapshot.occupancy);
    }

    /// One bit per cell, set where the cell is solid.
    pub fn occupancy(&self) -> &BitSlice {
        &self.occupancy
    }

    /// Number of solid cells.
    pub fn occupied_count(&self) -> usize {
        self.occupancy.count_ones()
    }

    /// Iterates the coordinates of every solid cell in storage order.
    pub fn occupied_coordinates(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.occupancy
            .iter_ones()
            .map(move |index| self.coordinates_of(index))
    }
}
