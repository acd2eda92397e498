//! # Voxel Task System
//!
//! Background work on the voxel grid itself. Runs on the dedicated collapse worker so
//! the main thread never waits on a large flood fill.

pub mod collapse_task;
