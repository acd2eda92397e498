//! # World Module
//!
//! This module provides the `World` struct, the synchronized adapter around the
//! authoritative column store. Every read and write of voxel data in the engine goes
//! through it.
//!
//! ## Coordinates
//!
//! `World` speaks world coordinates: `x` and `z` span the map, `y` is up with `0` at
//! the bottom. It converts to the store's storage coordinates (see `store`) in
//! `to_storage` and nowhere else.
//!
//! ## Locking
//!
//! - Point reads and bulk copies take the shared lock for their own duration only
//! - `set` takes the exclusive lock, writes, releases, then records the chunks whose
//!   meshes the write invalidated
//! - `read()` hands out a view that holds the shared lock across many reads, for
//!   short passes that need one consistent picture of the grid
//! - Long searches read through [`VoxelSource`] on the `World` itself, one short
//!   lock per read, and let `clear_voxels` recheck their result under the
//!   exclusive lock
//!
//! The dirty-chunk set has its own mutex. Lock order is always store first, then
//! dirty set, never the reverse.
//!
//! ## Boundary Policy
//!
//! Anything outside the grid reads as solid ground. Callers never need their own
//! bounds checks beyond that.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLockReadGuard};

use cgmath::{Point2, Point3};

use crate::core::MtResource;
use crate::engine_state::EngineError;

use super::block::{block_side::BlockSide, Block};
use super::snapshot::{NeighborhoodSnapshot, SNAPSHOT_BORDER};
use super::store::{ColumnStore, StoreDimensions};

/// The synchronized voxel store adapter.
///
/// # Examples
///
/// ```
/// use voxel_terrain::engine_state::voxels::{block::Block, store::DenseColumnStore, world::World};
///
/// let world = World::new(Box::new(DenseColumnStore::with_world_size(32, 16, 32)), 16);
/// world.set(3, 4, 5, Block::rgb(200, 10, 10));
///
/// assert!(!world.is_air(3, 4, 5));
/// assert_eq!(world.height_at(3, 5), Some(4));
/// // The write invalidated the chunk that owns (3, 5).
/// assert_eq!(world.take_dirty_chunks(), vec![cgmath::Point2::new(0, 0)]);
/// ```
pub struct World {
    store: MtResource<Box<dyn ColumnStore>>,
    size_x: usize,
    size_y: usize,
    size_z: usize,
    chunk_size: usize,
    dirty_chunks: Mutex<HashSet<Point2<i32>>>,
    epoch: AtomicU64,
}

impl World {
    /// Wraps `store`, whose chunks are `chunk_size × chunk_size` columns.
    pub fn new(store: Box<dyn ColumnStore>, chunk_size: usize) -> Self {
        let StoreDimensions {
            width,
            length,
            depth,
        } = store.dimensions();

        World {
            store: MtResource::new(store),
            size_x: width,
            size_y: depth,
            size_z: length,
            chunk_size,
            dirty_chunks: Mutex::new(HashSet::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// World extent along `x`.
    pub fn size_x(&self) -> usize {
        self.size_x
    }

    /// World height.
    pub fn size_y(&self) -> usize {
        self.size_y
    }

    /// World extent along `z`.
    pub fn size_z(&self) -> usize {
        self.size_z
    }

    /// Side length of a chunk in voxels.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Incremented every time the whole map is replaced.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Whether `(x, y, z)` lies inside the grid.
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.size_x
            && (y as usize) < self.size_y
            && (z as usize) < self.size_z
    }

    fn to_storage(&self, x: i32, y: i32, z: i32) -> (usize, usize, usize) {
        (x as usize, z as usize, self.size_y - 1 - y as usize)
    }

    /// Whether the voxel is air. Outside the grid nothing is air.
    pub fn is_air(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.contains(x, y, z) {
            return false;
        }
        let (sx, sy, sz) = self.to_storage(x, y, z);
        !self.store.get().is_solid(sx, sy, sz)
    }

    /// Whether the voxel is solid. Outside the grid everything is solid.
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        !self.is_air(x, y, z)
    }

    /// The voxel's color, `Block::AIR`, or `Block::GROUND` outside the grid.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Block {
        if !self.contains(x, y, z) {
            return Block::GROUND;
        }
        let (sx, sy, sz) = self.to_storage(x, y, z);
        self.store.get().get(sx, sy, sz)
    }

    /// Writes a voxel and invalidates every chunk whose mesh can see it.
    ///
    /// `Block::AIR` carves. Returns the previous block, or `None` (and does nothing)
    /// when the coordinate is outside the grid.
    pub fn set(&self, x: i32, y: i32, z: i32, block: Block) -> Option<Block> {
        if !self.contains(x, y, z) {
            return None;
        }
        let (sx, sy, sz) = self.to_storage(x, y, z);
        let previous = {
            let mut store = self.store.get_mut();
            let previous = store.get(sx, sy, sz);
            store.set(sx, sy, sz, block);
            previous
        };

        if previous != block {
            self.invalidate_around(x, z);
        }
        Some(previous)
    }

    /// Topmost solid `y` of the column at `(x, z)`, or `None` for an empty or
    /// out-of-grid column.
    pub fn height_at(&self, x: i32, z: i32) -> Option<i32> {
        if !self.contains(x, 0, z) {
            return None;
        }
        let store = self.store.get();
        (0..self.size_y as i32)
            .rev()
            .find(|&y| {
                let (sx, sy, sz) = self.to_storage(x, y, z);
                store.is_solid(sx, sy, sz)
            })
    }

    /// Copies the `size × size` chunk starting at world `(origin_x, origin_z)` plus
    /// its border into a private snapshot. The shared lock is held only for the copy.
    pub fn copy_column_region(&self, origin_x: i32, origin_z: i32, size: usize) -> NeighborhoodSnapshot {
        let mut snapshot =
            NeighborhoodSnapshot::filled(origin_x, origin_z, size, self.size_y, Block::GROUND);
        let mut column = vec![Block::AIR; self.size_y];
        let end = size as i32 + SNAPSHOT_BORDER;

        let store = self.store.get();
        for lz in -SNAPSHOT_BORDER..end {
            for lx in -SNAPSHOT_BORDER..end {
                let (wx, wz) = (origin_x + lx, origin_z + lz);
                if !self.contains(wx, 0, wz) {
                    continue;
                }
                store.copy_column(wx as usize, wz as usize, &mut column);
                for (slot, block) in snapshot.column_mut(lx, lz).iter_mut().zip(column.iter().rev()) {
                    *slot = *block;
                }
            }
        }

        snapshot
    }

    /// Holds the shared lock and returns a view for many consistent reads.
    pub fn read(&self) -> WorldView<'_> {
        WorldView {
            world: self,
            store: self.store.get(),
        }
    }

    /// Carves `voxels` under one exclusive lock, all or nothing.
    ///
    /// The set is carved only while the map is still the one of `epoch`, every voxel
    /// still holds its recorded color and no solid voxel outside the set touches it.
    /// Otherwise nothing is written.
    pub fn clear_voxels(&self, voxels: HashMap<Point3<i32>, Block>, epoch: u64) -> CarveOutcome {
        let touched_columns: HashSet<(i32, i32)> = {
            let mut store = self.store.get_mut();
            if self.epoch() != epoch {
                return CarveOutcome::MapReplaced;
            }

            let unchanged = voxels.iter().all(|(position, block)| {
                self.contains(position.x, position.y, position.z) && {
                    let (sx, sy, sz) = self.to_storage(position.x, position.y, position.z);
                    store.get(sx, sy, sz) == *block
                }
            });
            let sealed = voxels.keys().all(|position| {
                BlockSide::all().into_iter().all(|side| {
                    let next = *position + side.normal();
                    if voxels.contains_key(&next) || !self.contains(next.x, next.y, next.z) {
                        return true;
                    }
                    let (sx, sy, sz) = self.to_storage(next.x, next.y, next.z);
                    !store.is_solid(sx, sy, sz)
                })
            });
            if !unchanged || !sealed {
                return CarveOutcome::Changed;
            }

            for position in voxels.keys() {
                let (sx, sy, sz) = self.to_storage(position.x, position.y, position.z);
                store.set(sx, sy, sz, Block::AIR);
            }
            voxels.keys().map(|position| (position.x, position.z)).collect()
        };

        for (x, z) in &touched_columns {
            self.invalidate_around(*x, *z);
        }
        CarveOutcome::Carved(voxels)
    }

    /// Replaces the whole map. The new store must have the same dimensions.
    ///
    /// Pending dirty chunks are dropped and the epoch advances, so work computed
    /// against the old map can recognise itself as stale.
    pub fn replace_store(&self, store: Box<dyn ColumnStore>) -> Result<(), EngineError> {
        let expected = StoreDimensions {
            width: self.size_x,
            length: self.size_z,
            depth: self.size_y,
        };
        let found = store.dimensions();
        if found != expected {
            return Err(EngineError::MapDimensions { expected, found });
        }

        let mut guard = self.store.get_mut();
        *guard = store;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.lock_dirty().clear();
        Ok(())
    }

    fn lock_dirty(&self) -> MutexGuard<'_, HashSet<Point2<i32>>> {
        self.dirty_chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Chunk coordinates owning world column `(x, z)`.
    pub fn chunk_of(&self, x: i32, z: i32) -> Point2<i32> {
        let size = self.chunk_size as i32;
        Point2::new(x.div_euclid(size), z.div_euclid(size))
    }

    fn chunks_per_axis(&self) -> (i32, i32) {
        (
            (self.size_x / self.chunk_size) as i32,
            (self.size_z / self.chunk_size) as i32,
        )
    }

    /// Marks the chunk owning `(x, z)` dirty, plus the neighbours that share its edge
    /// or corner when the column lies on a chunk boundary.
    fn invalidate_around(&self, x: i32, z: i32) {
        let size = self.chunk_size as i32;
        let home = self.chunk_of(x, z);
        let (local_x, local_z) = (x.rem_euclid(size), z.rem_euclid(size));
        let offsets = |local: i32| -> Vec<i32> {
            let mut offsets = vec![0];
            if local == 0 {
                offsets.push(-1);
            }
            if local == size - 1 {
                offsets.push(1);
            }
            offsets
        };

        let (chunks_x, chunks_z) = self.chunks_per_axis();
        let mut dirty = self.lock_dirty();
        for dx in offsets(local_x) {
            for dz in offsets(local_z) {
                let chunk = Point2::new(home.x + dx, home.y + dz);
                if (0..chunks_x).contains(&chunk.x) && (0..chunks_z).contains(&chunk.y) {
                    dirty.insert(chunk);
                }
            }
        }
    }

    /// Marks a single chunk dirty.
    pub fn mark_chunk_dirty(&self, chunk: Point2<i32>) {
        self.lock_dirty().insert(chunk);
    }

    /// Drains the dirty-chunk set, in a deterministic order.
    pub fn take_dirty_chunks(&self) -> Vec<Point2<i32>> {
        let mut chunks: Vec<Point2<i32>> = self.lock_dirty().drain().collect();
        chunks.sort_by_key(|chunk| (chunk.x, chunk.y));
        chunks
    }

    /// Whether any chunk is waiting to be rebuilt.
    pub fn has_dirty_chunks(&self) -> bool {
        !self.lock_dirty().is_empty()
    }
}

/// What `World::clear_voxels` did with a voxel set.
#[derive(Debug, Clone, PartialEq)]
pub enum CarveOutcome {
    /// Every voxel was set to air; holds the voxels with their colors
    Carved(HashMap<Point3<i32>, Block>),
    /// The map was replaced since the set was computed
    MapReplaced,
    /// A voxel of the set changed, or a solid voxel now touches it
    Changed,
}

/// Point reads of the voxel grid with the world's boundary policy: outside the grid
/// everything is solid.
pub trait VoxelSource {
    fn contains(&self, x: i32, y: i32, z: i32) -> bool;
    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool;
    fn get(&self, x: i32, y: i32, z: i32) -> Block;
}

/// Each read takes the shared lock on its own, so writers can interleave.
impl VoxelSource for World {
    fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        World::contains(self, x, y, z)
    }

    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        World::is_solid(self, x, y, z)
    }

    fn get(&self, x: i32, y: i32, z: i32) -> Block {
        World::get(self, x, y, z)
    }
}

impl VoxelSource for WorldView<'_> {
    fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        WorldView::contains(self, x, y, z)
    }

    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        WorldView::is_solid(self, x, y, z)
    }

    fn get(&self, x: i32, y: i32, z: i32) -> Block {
        WorldView::get(self, x, y, z)
    }
}

/// Many reads under one shared lock. Obtained from `World::read`.
pub struct WorldView<'a> {
    world: &'a World,
    store: RwLockReadGuard<'a, Box<dyn ColumnStore>>,
}

impl WorldView<'_> {
    /// Whether the voxel is solid. Outside the grid everything is solid.
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.world.contains(x, y, z) {
            return true;
        }
        let (sx, sy, sz) = self.world.to_storage(x, y, z);
        self.store.is_solid(sx, sy, sz)
    }

    /// The voxel's color, `Block::AIR`, or `Block::GROUND` outside the grid.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Block {
        if !self.world.contains(x, y, z) {
            return Block::GROUND;
        }
        let (sx, sy, sz) = self.world.to_storage(x, y, z);
        self.store.get(sx, sy, sz)
    }

    /// Whether the coordinate lies inside the grid.
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        self.world.contains(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::store::DenseColumnStore;

    fn world(size_x: usize, size_y: usize, size_z: usize, chunk_size: usize) -> World {
        World::new(
            Box::new(DenseColumnStore::with_world_size(size_x, size_y, size_z)),
            chunk_size,
        )
    }

    #[test]
    fn outside_the_grid_is_solid() {
        let world = world(8, 8, 8, 4);
        assert!(world.is_solid(-1, 3, 3));
        assert!(world.is_solid(3, 8, 3));
        assert!(world.is_air(3, 3, 3));
        assert_eq!(world.get(9, 0, 0), Block::GROUND);
        assert_eq!(world.set(9, 0, 0, Block::rgb(1, 1, 1)), None);
    }

    #[test]
    fn world_y_is_stored_as_depth_from_the_top() {
        let mut store = DenseColumnStore::with_world_size(4, 8, 4);
        // Storage (x, y, z) = world (x, z, 7 - y).
        store.set(1, 2, 0, Block::rgb(5, 5, 5));
        let world = World::new(Box::new(store), 4);

        assert_eq!(world.get(1, 7, 2), Block::rgb(5, 5, 5));
        assert_eq!(world.height_at(1, 2), Some(7));
        assert_eq!(world.height_at(0, 0), None);
    }

    #[test]
    fn interior_edit_dirties_only_its_chunk() {
        let world = world(16, 8, 16, 4);
        world.set(5, 1, 6, Block::rgb(1, 1, 1));
        assert_eq!(world.take_dirty_chunks(), vec![Point2::new(1, 1)]);
        assert!(!world.has_dirty_chunks());
    }

    #[test]
    fn corner_edit_dirties_all_chunks_sharing_the_corner() {
        let world = world(16, 8, 16, 4);
        world.set(4, 1, 4, Block::rgb(1, 1, 1));
        assert_eq!(
            world.take_dirty_chunks(),
            vec![
                Point2::new(0, 0),
                Point2::new(0, 1),
                Point2::new(1, 0),
                Point2::new(1, 1)
            ]
        );
    }

    #[test]
    fn edge_of_the_map_does_not_dirty_missing_chunks() {
        let world = world(8, 8, 8, 4);
        world.set(0, 1, 0, Block::rgb(1, 1, 1));
        assert_eq!(world.take_dirty_chunks(), vec![Point2::new(0, 0)]);
    }

    #[test]
    fn rewriting_the_same_block_does_not_invalidate() {
        let world = world(8, 8, 8, 4);
        world.set(1, 1, 1, Block::AIR);
        assert!(!world.has_dirty_chunks());
    }

    #[test]
    fn region_copy_includes_border_and_fills_off_map_solid() {
        let world = world(8, 8, 8, 4);
        world.set(4, 2, 1, Block::rgb(9, 0, 0));

        let snapshot = world.copy_column_region(0, 0, 4);
        assert_eq!(snapshot.get(4, 2, 1), Block::rgb(9, 0, 0), "east border copied");
        assert!(snapshot.is_solid(-1, 5, 0), "off-map border is solid");
        assert!(!snapshot.is_solid(0, 5, 0));
    }

    fn slab(world: &World) -> HashMap<Point3<i32>, Block> {
        let stone = Block::rgb(120, 120, 120);
        (3..6)
            .map(|x| {
                world.set(x, 5, 4, stone);
                (Point3::new(x, 5, 4), stone)
            })
            .collect()
    }

    #[test]
    fn clear_voxels_carves_a_sealed_set() {
        let world = world(8, 8, 8, 4);
        let voxels = slab(&world);
        world.take_dirty_chunks();

        assert_eq!(
            world.clear_voxels(voxels.clone(), world.epoch()),
            CarveOutcome::Carved(voxels)
        );
        assert!((3..6).all(|x| world.is_air(x, 5, 4)));
        assert!(world.has_dirty_chunks());
    }

    #[test]
    fn clear_voxels_respects_epoch_and_recorded_color() {
        let world = world(8, 8, 8, 4);
        let mut voxels = slab(&world);
        assert_eq!(
            world.clear_voxels(voxels.clone(), world.epoch() + 1),
            CarveOutcome::MapReplaced
        );

        voxels.insert(Point3::new(4, 5, 4), Block::rgb(7, 7, 7));
        world.take_dirty_chunks();
        assert_eq!(world.clear_voxels(voxels, world.epoch()), CarveOutcome::Changed);
        assert!((3..6).all(|x| world.is_solid(x, 5, 4)), "nothing is carved");
        assert!(!world.has_dirty_chunks());
    }

    #[test]
    fn clear_voxels_refuses_a_set_that_gained_support() {
        let world = world(8, 8, 8, 4);
        let voxels = slab(&world);
        // Placed after the set was collected, under its last voxel.
        world.set(5, 4, 4, Block::rgb(60, 60, 60));

        assert_eq!(world.clear_voxels(voxels, world.epoch()), CarveOutcome::Changed);
        assert!((3..6).all(|x| world.is_solid(x, 5, 4)));
    }

    #[test]
    fn replace_store_checks_dimensions_and_bumps_epoch() {
        let world = world(8, 8, 8, 4);
        world.set(1, 1, 1, Block::rgb(1, 1, 1));

        let wrong = Box::new(DenseColumnStore::with_world_size(8, 4, 8));
        assert!(world.replace_store(wrong).is_err());

        let right = Box::new(DenseColumnStore::with_world_size(8, 8, 8));
        world.replace_store(right).unwrap();
        assert_eq!(world.epoch(), 1);
        assert!(world.is_air(1, 1, 1));
        assert!(!world.has_dirty_chunks());
    }
}
