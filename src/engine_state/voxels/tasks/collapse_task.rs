//! # Collapse Task
//!
//! Connectivity check run on the dedicated collapse worker after a voxel is removed.
//! Starting from one solid voxel, a search walks face-adjacent solid voxels. Reaching
//! the ground layer ends the search early: the voxel is still supported. Otherwise the
//! whole component has been collected; it is carved out of the world and handed back
//! as a [`CollapsingStructure`] for the main thread to simulate.
//!
//! The search reads the world one voxel at a time without holding its lock, so the
//! main thread keeps editing meanwhile. The carve rechecks the component under the
//! exclusive lock and the search runs again when an edit got in the way.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use cgmath::Point3;
use log::{debug, info};

use crate::engine_state::{
    task_management::task::Task,
    voxels::{
        block::{block_side::BlockSide, Block},
        falling::CollapsingStructure,
        world::{CarveOutcome, VoxelSource, World},
    },
};

/// Voxels at or below this height belong to the indestructible ground layer.
pub const GROUND_HEIGHT: i32 = 1;

/// Searches made without the lock before one runs under the shared lock.
const UNLOCKED_ATTEMPTS: usize = 3;

const COORD_BITS: u32 = 20;
const COORD_MASK: u64 = (1 << COORD_BITS) - 1;

/// Packs an in-grid coordinate into a heap key ordered by `y`, then `z`, then `x`.
fn pack(position: Point3<i32>) -> u64 {
    ((position.y as u64) << (2 * COORD_BITS)) | ((position.z as u64) << COORD_BITS) | position.x as u64
}

fn unpack(key: u64) -> Point3<i32> {
    Point3::new(
        (key & COORD_MASK) as i32,
        (key >> (2 * COORD_BITS)) as i32,
        ((key >> COORD_BITS) & COORD_MASK) as i32,
    )
}

/// Result of a connectivity search.
#[derive(Debug, Clone, PartialEq)]
pub enum Connectivity {
    /// The start voxel reaches the ground layer
    Grounded,
    /// The start voxel is air or outside the grid
    Empty,
    /// The complete unsupported component, with colors
    Floating(HashMap<Point3<i32>, Block>),
}

/// Searches the solid component containing `start`.
///
/// Visits voxels lowest first (a min-heap on packed coordinates), so grounded terrain
/// is recognised after few steps. The result depends only on the voxels `view` sees.
pub fn search_component<V: VoxelSource + ?Sized>(view: &V, start: Point3<i32>) -> Connectivity {
    if !view.contains(start.x, start.y, start.z) || !view.is_solid(start.x, start.y, start.z) {
        return Connectivity::Empty;
    }

    let mut frontier = BinaryHeap::new();
    let mut seen = HashSet::new();
    let mut component = HashMap::new();
    frontier.push(Reverse(pack(start)));
    seen.insert(pack(start));

    while let Some(Reverse(key)) = frontier.pop() {
        let position = unpack(key);
        if position.y <= GROUND_HEIGHT {
            return Connectivity::Grounded;
        }
        component.insert(position, view.get(position.x, position.y, position.z));

        for side in BlockSide::all() {
            let next = position + side.normal();
            if !view.contains(next.x, next.y, next.z) || !view.is_solid(next.x, next.y, next.z) {
                continue;
            }
            if seen.insert(pack(next)) {
                frontier.push(Reverse(pack(next)));
            }
        }
    }

    Connectivity::Floating(component)
}

/// Voxel-count-weighted centroid of a voxel set, measured at voxel centers.
pub fn centroid(voxels: &HashMap<Point3<i32>, Block>) -> Point3<f32> {
    let count = voxels.len().max(1) as f32;
    let (x, y, z) = voxels.keys().fold((0.0, 0.0, 0.0), |(x, y, z), position| {
        (
            x + position.x as f32 + 0.5,
            y + position.y as f32 + 0.5,
            z + position.z as f32 + 0.5,
        )
    });
    Point3::new(x / count, y / count, z / count)
}

/// A voxel whose support may have been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseRequest {
    pub position: Point3<i32>,
}

/// What a collapse check concluded.
#[derive(Debug)]
pub enum CollapseOutcome {
    /// Still supported; nothing changed
    Connected,
    /// Nothing solid to check, or the map changed under the search
    NoStructure,
    /// Carved out of the world and ready to fall
    Detached(CollapsingStructure),
}

/// Output of a [`CollapseTask`].
#[derive(Debug)]
pub struct CollapseReport {
    pub start: Point3<i32>,
    /// Map epoch the search ran against
    pub epoch: u64,
    pub outcome: CollapseOutcome,
}

/// Connectivity check for one voxel, executed on the collapse worker.
pub struct CollapseTask {
    /// The shared world searched and carved
    world: Arc<World>,
    request: CollapseRequest,
}

impl CollapseTask {
    pub fn new(world: Arc<World>, request: CollapseRequest) -> Self {
        CollapseTask { world, request }
    }
}

impl Task for CollapseTask {
    type Output = CollapseReport;

    /// Searches, then carves under the exclusive lock. A carve refused because the
    /// component changed in between sends the check back to the search.
    fn process(&self) -> CollapseReport {
        let start = self.request.position;
        let epoch = self.world.epoch();

        let mut outcome = CollapseOutcome::NoStructure;
        for attempt in 0..=UNLOCKED_ATTEMPTS {
            let connectivity = if attempt < UNLOCKED_ATTEMPTS {
                search_component(&*self.world, start)
            } else {
                search_component(&self.world.read(), start)
            };

            let voxels = match connectivity {
                Connectivity::Grounded => {
                    outcome = CollapseOutcome::Connected;
                    break;
                }
                Connectivity::Empty => break,
                Connectivity::Floating(voxels) => voxels,
            };

            match self.world.clear_voxels(voxels, epoch) {
                CarveOutcome::Carved(cleared) => {
                    info!("Structure of {} voxels detached at {:?}", cleared.len(), start);
                    let pivot = centroid(&cleared);
                    outcome = CollapseOutcome::Detached(CollapsingStructure::new(cleared, pivot));
                    break;
                }
                CarveOutcome::MapReplaced => {
                    debug!("Collapse at {:?} outlived its map", start);
                    break;
                }
                CarveOutcome::Changed => {
                    debug!("Structure at {:?} changed while searched, attempt {}", start, attempt + 1);
                }
            }
        }

        CollapseReport {
            start,
            epoch,
            outcome,
        }
    }
}
