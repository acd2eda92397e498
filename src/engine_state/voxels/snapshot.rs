//! # Neighborhood Snapshot
//!
//! A private copy of one chunk's voxels plus a one-voxel border on every horizontal
//! side. Mesh workers take a snapshot while holding the store's read lock, release
//! the lock, and then mesh from the copy for as long as they like.
//!
//! Coordinates are chunk-local world axes (Y up): `x` and `z` range over
//! `-1..=size`, `y` over `0..height`. Lookups outside that range follow the
//! boundary policy:
//! - below the world (`y < 0`) is solid, so the bottom layer never shows its underside
//! - above the world (`y >= height`) is air, so the top layer is always exposed
//! - beyond the border horizontally is solid
//!
//! World-edge columns inside the border are filled solid by the copy, so faces on
//! the outer rim of the map are never emitted.

use super::block::Block;

/// Width of the border copied around a chunk.
pub const SNAPSHOT_BORDER: i32 = 1;

/// Bounds-checked copy of a chunk and its immediate surroundings.
#[derive(Clone, Debug)]
pub struct NeighborhoodSnapshot {
    origin_x: i32,
    origin_z: i32,
    size: usize,
    height: usize,
    blocks: Vec<Block>,
}

impl NeighborhoodSnapshot {
    /// Creates a snapshot for the chunk whose first voxel is at world `(origin_x, origin_z)`,
    /// with every cell (border included) set to `fill`.
    pub fn filled(origin_x: i32, origin_z: i32, size: usize, height: usize, fill: Block) -> Self {
        let wrapped = size + 2 * SNAPSHOT_BORDER as usize;
        NeighborhoodSnapshot {
            origin_x,
            origin_z,
            size,
            height,
            blocks: vec![fill; wrapped * wrapped * height],
        }
    }

    /// World `x` of local `x = 0`.
    pub fn origin_x(&self) -> i32 {
        self.origin_x
    }

    /// World `z` of local `z = 0`.
    pub fn origin_z(&self) -> i32 {
        self.origin_z
    }

    /// Interior width of the snapshot (the chunk size).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of vertical layers (the world height).
    pub fn height(&self) -> usize {
        self.height
    }

    fn wrapped(&self) -> i32 {
        self.size as i32 + 2 * SNAPSHOT_BORDER
    }

    fn in_border(&self, x: i32, z: i32) -> bool {
        let limit = self.size as i32 + SNAPSHOT_BORDER;
        (-SNAPSHOT_BORDER..limit).contains(&x) && (-SNAPSHOT_BORDER..limit).contains(&z)
    }

    /// Flat index of local `(x, y, z)`. Columns are contiguous, bottom first.
    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        let column = (z + SNAPSHOT_BORDER) * self.wrapped() + (x + SNAPSHOT_BORDER);
        column as usize * self.height + y as usize
    }

    /// The block at local `(x, y, z)`, applying the boundary policy outside the copy.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Block {
        if y < 0 || !self.in_border(x, z) {
            return Block::GROUND;
        }
        if y >= self.height as i32 {
            return Block::AIR;
        }
        self.blocks[self.index(x, y, z)]
    }

    /// Whether local `(x, y, z)` is solid under the boundary policy.
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.get(x, y, z).is_solid()
    }

    /// Mutable access to the column at local `(x, z)`, indexed by world `y`.
    ///
    /// # Panics
    /// Panics if `(x, z)` lies outside the bordered area.
    pub fn column_mut(&mut self, x: i32, z: i32) -> &mut [Block] {
        assert!(self.in_border(x, z), "column ({x}, {z}) outside snapshot");
        let start = self.index(x, 0, z);
        let height = self.height;
        &mut self.blocks[start..start + height]
    }

    /// Topmost solid `y` of the interior column at `(x, z)`.
    pub fn top_solid(&self, x: i32, z: i32) -> Option<i32> {
        (0..self.height as i32).rev().find(|&y| self.is_solid(x, y, z))
    }
}
