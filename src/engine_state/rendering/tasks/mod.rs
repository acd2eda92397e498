//! Background tasks for the rendering side of the engine.
//!
//! # Available Tasks
//! - `ChunkMeshGenerationTask`: builds a chunk mesh and minimap strip on a mesh worker

pub mod chunk_mesh_generation_task;
