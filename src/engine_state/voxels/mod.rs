//! # Voxels
//!
//! The authoritative voxel grid and everything derived from or simulated on it.
//!
//! ## Architecture
//!
//! * **Block**: a voxel's color, the air sentinel and the six face directions
//! * **Store**: the column-store seam and its dense in-memory implementation
//! * **World**: the synchronized adapter every read and write goes through
//! * **Snapshot**: bordered private copies of a chunk for the mesh workers
//! * **Chunk**: per-chunk mesh state and the rebuild queue
//! * **Damage**: the decaying per-voxel damage map
//! * **Falling / Particles**: detached structures and their debris
//! * **Tasks**: the collapse connectivity check
//!
//! ## Data Flow
//!
//! 1. Edits go through `World::set`, which marks the affected chunks dirty
//! 2. The engine moves dirty chunks into the chunk grid's rebuild queue
//! 3. Removals also schedule collapse checks on the collapse worker
//! 4. Detached structures come back as `CollapsingStructure`s to simulate
//!
//! Everything outside `store` and `world` is a derived cache and can be rebuilt from
//! the store alone.

pub mod block;
pub mod chunk;
pub mod damage;
pub mod falling;
pub mod generation;
pub mod particles;
pub mod snapshot;
pub mod store;
pub mod tasks;
pub mod world;
