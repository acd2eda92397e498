#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Terrain
//!
//! A destructible voxel terrain engine: a dense column store behind a reader/writer
//! lock, chunked mesh generation on a pool of worker threads, and a structural
//! collapse simulation that detaches unsupported voxels and lets them fall.
//!
//! ## Key Modules
//!
//! * `core` - Concurrency primitives: the bounded channel, the entity system and the
//!   shared resource wrapper
//! * `engine_state` - The `TerrainEngine` and everything it owns: the voxel store
//!   adapter, meshers, worker pools, damage map and falling structures
//!
//! ## Threading
//!
//! The main thread owns the engine and calls `TerrainEngine::update` once per frame.
//! Mesh workers and the single collapse worker read the world through its lock; the
//! collapse worker is the only background writer. Every handoff between threads goes
//! through a bounded `core::Channel`.
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_terrain::engine_state::{EngineConfig, TerrainEngine};
//! use voxel_terrain::engine_state::voxels::generation::generate_terrain;
//! use web_time::Instant;
//!
//! voxel_terrain::init_logger();
//! let mut engine = TerrainEngine::new(EngineConfig::default()).unwrap();
//! generate_terrain(engine.world(), 7);
//! while !engine.is_idle() {
//!     engine.update(1.0 / 60.0, Instant::now());
//! }
//! ```

use log::info;

pub mod core;
pub mod engine_state;

/// Installs the global logger, writing to stdout and filtered by `RUST_LOG`.
///
/// Calling it more than once is harmless; later calls leave the first logger in place.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if installed {
        info!("Logger initialized");
    }
}
