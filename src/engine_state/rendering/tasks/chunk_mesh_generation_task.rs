//! Task for building chunk meshes on a mesh worker.
//!
//! This module contains the `ChunkMeshGenerationTask`, which snapshots one chunk's
//! voxel neighbourhood, meshes it with the configured mesher and computes its minimap
//! strip. The store's read lock is held only while the snapshot is copied, never while
//! meshing.

use std::sync::Arc;

use cgmath::Point2;

use crate::engine_state::{
    rendering::{
        meshing::{build_chunk_mesh, tesselator::Tesselator, MeshingOptions},
        minimap,
    },
    task_management::task::Task,
    voxels::{block::Block, world::World},
};

/// A request to rebuild one chunk. Carries no voxel data; the worker copies the
/// neighbourhood itself at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuildRequest {
    /// Chunk grid coordinates
    pub chunk: Point2<i32>,
    /// Per-grid build counter; a larger value is a more recent request
    pub generation: u64,
}

/// A finished chunk build, consumed once by the main thread.
#[derive(Debug, Clone)]
pub struct MeshBuildResult {
    /// Chunk grid coordinates
    pub chunk: Point2<i32>,
    /// Generation of the request this result answers
    pub generation: u64,
    /// Tallest solid voxel in the chunk, `None` if the chunk is empty
    pub max_height: Option<i32>,
    /// The chunk geometry in world coordinates
    pub mesh: Tesselator,
    /// Top-down colors, `chunk_size²` entries, `x` varying fastest
    pub minimap: Vec<Block>,
}

/// Builds one chunk mesh in a background thread.
pub struct ChunkMeshGenerationTask {
    /// Shared reference to the voxel store adapter
    world: Arc<World>,
    /// Which chunk to build
    request: MeshBuildRequest,
    /// Mesher selection
    options: MeshingOptions,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `world` - The shared voxel store adapter
    /// * `request` - The chunk and generation to build
    /// * `options` - Which mesher to run and whether to compute ambient occlusion
    pub fn new(world: Arc<World>, request: MeshBuildRequest, options: MeshingOptions) -> Self {
        ChunkMeshGenerationTask {
            world,
            request,
            options,
        }
    }

    /// The chunk and generation this task builds.
    pub fn request(&self) -> MeshBuildRequest {
        self.request
    }
}

impl Task for ChunkMeshGenerationTask {
    type Output = MeshBuildResult;

    /// Snapshots, meshes and summarises the chunk.
    ///
    /// # Returns
    /// The mesh, minimap strip and maximum height, tagged with the request's
    /// chunk and generation.
    fn process(&self) -> MeshBuildResult {
        let size = self.world.chunk_size();
        let origin_x = self.request.chunk.x * size as i32;
        let origin_z = self.request.chunk.y * size as i32;

        let snapshot = self.world.copy_column_region(origin_x, origin_z, size);
        let mesh = build_chunk_mesh(&snapshot, self.options);
        let minimap = minimap::build_strip(&snapshot);
        let max_height = (0..size as i32)
            .flat_map(|z| (0..size as i32).map(move |x| (x, z)))
            .filter_map(|(x, z)| snapshot.top_solid(x, z))
            .max();

        MeshBuildResult {
            chunk: self.request.chunk,
            generation: self.request.generation,
            max_height,
            mesh,
            minimap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::store::DenseColumnStore;

    #[test]
    fn builds_the_requested_chunk() {
        let world = Arc::new(World::new(Box::new(DenseColumnStore::with_world_size(16, 8, 16)), 8));
        world.set(9, 3, 2, Block::rgb(10, 20, 30));

        let request = MeshBuildRequest {
            chunk: Point2::new(1, 0),
            generation: 7,
        };
        let result = ChunkMeshGenerationTask::new(world, request, MeshingOptions::default()).process();

        assert_eq!(result.chunk, Point2::new(1, 0));
        assert_eq!(result.generation, 7);
        assert_eq!(result.max_height, Some(3));
        assert_eq!(result.mesh.quad_count(), 6);
        assert_eq!(result.minimap.len(), 64);
        assert_eq!(result.minimap[2 * 8 + 1], Block::rgb(10, 20, 30));
        for quad in result.mesh.quads() {
            let (min, max) = quad.bounds();
            assert!(min.x >= 9.0 && max.x <= 10.0);
        }
    }

    #[test]
    fn empty_chunk_has_no_height() {
        let world = Arc::new(World::new(Box::new(DenseColumnStore::with_world_size(8, 8, 8)), 8));
        let request = MeshBuildRequest {
            chunk: Point2::new(0, 0),
            generation: 1,
        };
        let result = ChunkMeshGenerationTask::new(world, request, MeshingOptions::default()).process();
        assert_eq!(result.max_height, None);
        assert!(result.mesh.is_empty());
    }
}
