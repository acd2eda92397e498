//! # Column Store
//!
//! The authoritative voxel grid lives behind the `ColumnStore` trait. The trait is
//! the seam to the external column-store library: the engine only ever needs point
//! reads and writes plus a bulk copy of one vertical column.
//!
//! ## Storage Coordinates
//!
//! A column store is addressed in *storage* coordinates, which differ from the
//! engine's world coordinates:
//!
//! | storage | world                       |
//! |---------|-----------------------------|
//! | `x`     | `x`                         |
//! | `y`     | `z`                         |
//! | `z`     | `size_y - 1 - y` (depth)    |
//!
//! Storage `z = 0` is the top of the world. The conversion is done in exactly one
//! place, `World`, so meshing and physics always agree about which way is up.
//!
//! `DenseColumnStore` is the in-memory implementation used by the demo and tests.

use bitvec::prelude::BitVec;

use super::block::Block;

/// Dimensions of a column store, in storage axes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StoreDimensions {
    /// Extent along storage `x` (world `x`).
    pub width: usize,
    /// Extent along storage `y` (world `z`).
    pub length: usize,
    /// Extent along storage `z`, the column depth (world height).
    pub depth: usize,
}

/// Point and column access to a voxel grid, in storage coordinates.
///
/// Implementations must be `Send + Sync`; the engine serializes access with its own
/// reader/writer lock, so no internal synchronization is required.
///
/// Callers guarantee coordinates are inside `dimensions()`.
pub trait ColumnStore: Send + Sync {
    /// Size of the grid.
    fn dimensions(&self) -> StoreDimensions;

    /// Whether the voxel holds a color.
    fn is_solid(&self, x: usize, y: usize, z: usize) -> bool;

    /// The voxel's color, or `Block::AIR`.
    fn get(&self, x: usize, y: usize, z: usize) -> Block;

    /// Writes a voxel. `Block::AIR` carves it out.
    fn set(&mut self, x: usize, y: usize, z: usize, block: Block);

    /// Copies the full column at `(x, y)` into `out`, top (`z = 0`) first.
    ///
    /// `out.len()` must equal `dimensions().depth`.
    fn copy_column(&self, x: usize, y: usize, out: &mut [Block]);
}

/// A fully materialised column store.
///
/// Columns are stored contiguously so `copy_column` is a single slice copy, and a
/// bit per voxel answers `is_solid` without touching the color array.
pub struct DenseColumnStore {
    dimensions: StoreDimensions,
    solid: BitVec,
    colors: Vec<Block>,
}

impl DenseColumnStore {
    /// Creates a store of the given storage dimensions filled with air.
    pub fn new(width: usize, length: usize, depth: usize) -> Self {
        let len = width * length * depth;
        DenseColumnStore {
            dimensions: StoreDimensions {
                width,
                length,
                depth,
            },
            solid: BitVec::repeat(false, len),
            colors: vec![Block::AIR; len],
        }
    }

    /// Creates an air-filled store matching a world of `size_x × size_y × size_z`
    /// (world axes, Y up).
    pub fn with_world_size(size_x: usize, size_y: usize, size_z: usize) -> Self {
        Self::new(size_x, size_z, size_y)
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.dimensions.width + x) * self.dimensions.depth + z
    }

    /// Number of solid voxels in the whole store.
    pub fn solid_count(&self) -> usize {
        self.solid.count_ones()
    }
}

impl ColumnStore for DenseColumnStore {
    fn dimensions(&self) -> StoreDimensions {
        self.dimensions
    }

    fn is_solid(&self, x: usize, y: usize, z: usize) -> bool {
        self.solid[self.index(x, y, z)]
    }

    fn get(&self, x: usize, y: usize, z: usize) -> Block {
        self.colors[self.index(x, y, z)]
    }

    fn set(&mut self, x: usize, y: usize, z: usize, block: Block) {
        let index = self.index(x, y, z);
        self.solid.set(index, block.is_solid());
        self.colors[index] = block;
    }

    fn copy_column(&self, x: usize, y: usize, out: &mut [Block]) {
        let start = self.index(x, y, 0);
        out.copy_from_slice(&self.colors[start..start + self.dimensions.depth]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_track_solidity() {
        let mut store = DenseColumnStore::new(4, 3, 8);
        assert!(!store.is_solid(1, 2, 3));

        store.set(1, 2, 3, Block::rgb(1, 2, 3));
        assert!(store.is_solid(1, 2, 3));
        assert_eq!(store.get(1, 2, 3), Block::rgb(1, 2, 3));
        assert_eq!(store.solid_count(), 1);

        store.set(1, 2, 3, Block::AIR);
        assert!(!store.is_solid(1, 2, 3));
        assert_eq!(store.solid_count(), 0);
    }

    #[test]
    fn copy_column_returns_top_first() {
        let mut store = DenseColumnStore::new(2, 2, 4);
        store.set(1, 0, 0, Block::rgb(9, 9, 9));
        store.set(1, 0, 3, Block::rgb(1, 1, 1));

        let mut column = [Block::AIR; 4];
        store.copy_column(1, 0, &mut column);
        assert_eq!(
            column,
            [Block::rgb(9, 9, 9), Block::AIR, Block::AIR, Block::rgb(1, 1, 1)]
        );
    }

    #[test]
    fn world_size_constructor_swaps_axes() {
        let store = DenseColumnStore::with_world_size(8, 4, 16);
        assert_eq!(
            store.dimensions(),
            StoreDimensions {
                width: 8,
                length: 16,
                depth: 4
            }
        );
    }
}
