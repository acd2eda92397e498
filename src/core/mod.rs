//! # Core Module
//!
//! Concurrency primitives shared by every subsystem of the terrain engine.
//!
//! ## Key Components
//! - `Channel`: Fixed-capacity blocking FIFO, the only cross-thread handoff mechanism
//! - `EntitySystem`: Mutex-guarded growable array with predicate-based removal
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//!
//! ## Usage
//! ```rust
//! use voxel_terrain::core::{Channel, EntitySystem, MtResource};
//!
//! let channel = Channel::new(8);
//! channel.put(42u32);
//! assert_eq!(channel.await_item(), Some(42));
//!
//! let store = MtResource::new(0u32);
//! *store.get_mut() += 1;
//! assert_eq!(*store.get(), 1);
//!
//! let entities = EntitySystem::new();
//! entities.add("debris");
//! assert_eq!(entities.len(), 1);
//! ```

pub mod channel;
pub mod entity_system;
pub mod mt_resource;

pub use channel::Channel;
pub use entity_system::EntitySystem;
pub use mt_resource::MtResource;
