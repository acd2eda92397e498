//! # Engine State Module
//!
//! The terrain engine context and the subsystems it owns.
//!
//! ## Key Components
//!
//! * `TerrainEngine` - Owns every piece of engine state and drives one frame at a time
//! * `config` - Serde configuration with defaults and validation
//! * `rendering` - Meshers, minimap, damage overlay and the mesh build task
//! * `task_management` - The supervised worker pools
//! * `voxels` - The voxel store adapter, chunk grid, damage map and collapse simulation
//!
//! ## Initialization Order
//!
//! Voxel store adapter, then chunk grid, then channels and worker pools. Teardown runs
//! in reverse: `shutdown` (or drop) sends every worker a stop item and joins it.
//!
//! ## Frame Order
//!
//! `TerrainEngine::update` runs once per frame on the main thread:
//! 1. Drain mesh results and adopt the newest per chunk
//! 2. Drain collapse reports and spawn detached structures
//! 3. Move dirty chunks into the rebuild queue and publish what fits
//! 4. Step falling structures and particles
//! 5. Decay the damage map

use std::collections::HashSet;
use std::sync::Arc;

use cgmath::{Point2, Point3};
use log::{info, warn};
use web_time::Instant;

use crate::core::EntitySystem;

use rendering::{
    meshing::{tesselator::Tesselator, MeshingOptions},
    minimap::Minimap,
    overlay::build_damage_overlay,
    tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask,
};
use task_management::{worker_count, WorkerPool};
use voxels::{
    block::{block_side::BlockSide, Block},
    chunk::ChunkGrid,
    damage::DamageMap,
    falling::{CollapsingStructure, FallSettings, FallStep},
    particles::Particle,
    store::{ColumnStore, DenseColumnStore, StoreDimensions},
    tasks::collapse_task::{CollapseOutcome, CollapseRequest, CollapseTask, GROUND_HEIGHT},
    world::World,
};

pub mod config;
mod error;
pub mod rendering;
pub mod task_management;
pub mod voxels;

pub use config::EngineConfig;
pub use error::EngineError;

/// A discrete edit delivered by the network or edit layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    /// Writes a voxel; `Block::AIR` carves
    SetBlock { position: Point3<i32>, block: Block },
    /// Carves a voxel
    ClearBlock { position: Point3<i32> },
    /// Carves every voxel in the inclusive box
    ClearRegion { min: Point3<i32>, max: Point3<i32> },
}

/// What happened during one call to `TerrainEngine::update`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Chunks whose live mesh was replaced
    pub adopted_chunks: usize,
    /// Mesh results dropped because a newer one won
    pub stale_results_discarded: usize,
    /// Mesh requests handed to the workers
    pub chunks_published: usize,
    /// Collapse checks that came back
    pub collapse_checks_completed: usize,
    /// Structures detached and now falling
    pub structures_spawned: usize,
    /// Structures that came to rest and turned into particles
    pub structures_dissolved: usize,
}

/// The terrain engine context.
///
/// # Examples
///
/// ```no_run
/// use voxel_terrain::engine_state::{EditCommand, EngineConfig, TerrainEngine};
/// use web_time::Instant;
///
/// let mut engine = TerrainEngine::new(EngineConfig::default()).unwrap();
/// engine.apply_edit(EditCommand::ClearBlock { position: cgmath::Point3::new(10, 5, 10) });
///
/// // Main loop
/// loop {
///     let report = engine.update(1.0 / 60.0, Instant::now());
///     if engine.is_idle() {
///         break;
///     }
/// }
/// ```
pub struct TerrainEngine {
    config: EngineConfig,
    /// The voxel store adapter shared with every worker
    world: Arc<World>,
    chunks: ChunkGrid,
    minimap: Minimap,
    mesh_workers: WorkerPool<ChunkMeshGenerationTask>,
    collapse_worker: WorkerPool<CollapseTask>,
    structures: EntitySystem<CollapsingStructure>,
    particles: EntitySystem<Particle>,
    damage: DamageMap,
    meshing: MeshingOptions,
    fall: FallSettings,
    origin_chunk: Point2<i32>,
}

impl TerrainEngine {
    /// Creates an engine over an empty world of the configured size.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let [size_x, size_y, size_z] = config.world_size;
        let store = DenseColumnStore::with_world_size(size_x, size_y, size_z);
        Self::with_store(config, Box::new(store))
    }

    /// Creates an engine over an existing store, whose dimensions must match the
    /// configured world size.
    pub fn with_store(config: EngineConfig, store: Box<dyn ColumnStore>) -> Result<Self, EngineError> {
        config.validate()?;
        let [size_x, size_y, size_z] = config.world_size;
        let expected = StoreDimensions {
            width: size_x,
            length: size_z,
            depth: size_y,
        };
        if store.dimensions() != expected {
            return Err(EngineError::MapDimensions {
                expected,
                found: store.dimensions(),
            });
        }

        let world = Arc::new(World::new(store, config.chunk_size));

        let (chunks_x, chunks_z) = config.chunks_per_axis();
        let mut chunks = ChunkGrid::new(chunks_x, chunks_z, config.chunk_size);
        let origin_chunk = clamp_origin(config.origin_chunk(), chunks_x, chunks_z);

        let mesh_workers = WorkerPool::new(
            "mesh",
            worker_count(config.max_workers),
            config.work_channel_capacity,
            config.result_channel_capacity,
        )?;
        let collapse_worker = WorkerPool::new(
            "collapse",
            1,
            config.collapse_channel_capacity,
            config.collapse_channel_capacity,
        )?;

        let queued = chunks.enqueue_all(origin_chunk);
        info!(
            "Terrain engine ready: {}x{}x{} voxels, {} chunks queued from {:?}",
            size_x, size_y, size_z, queued, origin_chunk
        );

        Ok(TerrainEngine {
            minimap: Minimap::new(size_x, size_z),
            damage: DamageMap::new(config.damage_decay(), config.destroy_cooldown()),
            meshing: config.meshing_options(),
            fall: config.fall_settings(),
            structures: EntitySystem::new(),
            particles: EntitySystem::new(),
            config,
            world,
            chunks,
            mesh_workers,
            collapse_worker,
            origin_chunk,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The voxel store adapter.
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn chunks(&self) -> &ChunkGrid {
        &self.chunks
    }

    pub fn minimap(&self) -> &Minimap {
        &self.minimap
    }

    pub fn damage(&self) -> &DamageMap {
        &self.damage
    }

    /// Structures currently falling.
    pub fn structures(&self) -> &EntitySystem<CollapsingStructure> {
        &self.structures
    }

    pub fn particles(&self) -> &EntitySystem<Particle> {
        &self.particles
    }

    /// Number of mesh worker threads.
    pub fn mesh_worker_count(&self) -> usize {
        self.mesh_workers.num_workers()
    }

    /// Applies one edit and schedules collapse checks around every removed voxel.
    ///
    /// # Returns
    /// The number of voxels that changed.
    pub fn apply_edit(&mut self, command: EditCommand) -> usize {
        let mut removed = Vec::new();
        let mut changed = 0;

        let mut write = |position: Point3<i32>, block: Block| {
            if let Some(previous) = self.world.set(position.x, position.y, position.z, block) {
                if previous != block {
                    changed += 1;
                    if previous.is_solid() && block.is_air() {
                        removed.push(position);
                    }
                }
            }
        };

        match command {
            EditCommand::SetBlock { position, block } => write(position, block),
            EditCommand::ClearBlock { position } => write(position, Block::AIR),
            EditCommand::ClearRegion { min, max } => {
                let lower = Point3::new(min.x.min(max.x).max(0), min.y.min(max.y).max(0), min.z.min(max.z).max(0));
                let upper = Point3::new(
                    min.x.max(max.x).min(self.world.size_x() as i32 - 1),
                    min.y.max(max.y).min(self.world.size_y() as i32 - 1),
                    min.z.max(max.z).min(self.world.size_z() as i32 - 1),
                );
                for x in lower.x..=upper.x {
                    for y in lower.y..=upper.y {
                        for z in lower.z..=upper.z {
                            write(Point3::new(x, y, z), Block::AIR);
                        }
                    }
                }
            }
        }

        self.schedule_collapse_checks(&removed);
        changed
    }

    /// Queues a connectivity check for every solid face neighbour of the removed voxels.
    fn schedule_collapse_checks(&mut self, removed: &[Point3<i32>]) {
        let mut candidates = HashSet::new();
        for position in removed {
            for side in BlockSide::all() {
                let neighbour = *position + side.normal();
                if neighbour.y > GROUND_HEIGHT
                    && self.world.contains(neighbour.x, neighbour.y, neighbour.z)
                    && self.world.is_solid(neighbour.x, neighbour.y, neighbour.z)
                {
                    candidates.insert(neighbour);
                }
            }
        }

        let mut candidates: Vec<Point3<i32>> = candidates.into_iter().collect();
        candidates.sort_by_key(|position| (position.y, position.z, position.x));
        for position in candidates {
            let task = CollapseTask::new(self.world.clone(), CollapseRequest { position });
            self.collapse_worker.publish_task(task);
        }
    }

    /// Registers a hit on a voxel. If the voxel is fully damaged and its destroy
    /// cooldown allows, it is carved.
    ///
    /// # Returns
    /// Whether the voxel was destroyed.
    pub fn damage_block(&mut self, position: Point3<i32>, amount: u8, now: Instant) -> bool {
        if !self.world.contains(position.x, position.y, position.z)
            || self.world.is_air(position.x, position.y, position.z)
        {
            return false;
        }
        self.damage.apply_damage(position, amount, now);
        if !self.damage.try_destroy_action(position, now) {
            return false;
        }
        self.apply_edit(EditCommand::ClearBlock { position }) > 0
    }

    /// Replaces the whole map and rebuilds everything derived from it.
    ///
    /// Queued and uncollected work is discarded, every chunk returns to `Empty`,
    /// falling structures, particles and damage are dropped, and the whole world is
    /// queued again from the origin chunk.
    pub fn load_map(&mut self, store: Box<dyn ColumnStore>) -> Result<(), EngineError> {
        self.world.replace_store(store)?;

        let dropped = self.mesh_workers.clear() + self.collapse_worker.clear();
        self.chunks.reset();
        self.minimap.clear();
        self.structures.clear();
        self.particles.clear();
        self.damage.clear();
        let queued = self.chunks.enqueue_all(self.origin_chunk);

        info!(
            "Map loaded (epoch {}): {} pending task(s) dropped, {} chunks queued",
            self.world.epoch(),
            dropped,
            queued
        );
        Ok(())
    }

    /// Runs one frame of main-thread work.
    ///
    /// # Arguments
    /// * `dt` - Seconds since the previous frame
    /// * `now` - Current time, for damage decay
    pub fn update(&mut self, dt: f32, now: Instant) -> FrameReport {
        let mut report = FrameReport::default();

        self.adopt_meshes(&mut report);
        self.adopt_collapses(&mut report);

        for chunk in self.world.take_dirty_chunks() {
            self.chunks.enqueue(chunk);
        }
        report.chunks_published = self.publish_mesh_requests();

        report.structures_dissolved = self.step_bodies(dt);
        self.damage.tick(now, &self.world);

        report
    }

    fn adopt_meshes(&mut self, report: &mut FrameReport) {
        let results = self.mesh_workers.process_completed_tasks();
        for task in self.mesh_workers.take_failed_tasks() {
            let request = task.request();
            warn!("Mesh build {} of chunk {:?} failed", request.generation, request.chunk);
            self.chunks.abandon(request);
        }
        if results.is_empty() {
            return;
        }

        let size = self.chunks.chunk_size();
        let adoption = self.chunks.adopt(results);
        report.adopted_chunks = adoption.strips.len();
        report.stale_results_discarded = adoption.stale;

        for (chunk, strip) in adoption.strips {
            self.minimap.update_strip(
                chunk.x as usize * size,
                chunk.y as usize * size,
                size,
                &strip,
            );
        }
    }

    fn adopt_collapses(&mut self, report: &mut FrameReport) {
        let epoch = self.world.epoch();
        for collapse in self.collapse_worker.process_completed_tasks() {
            report.collapse_checks_completed += 1;
            if collapse.epoch != epoch {
                continue;
            }
            if let CollapseOutcome::Detached(structure) = collapse.outcome {
                self.structures.add(structure);
                report.structures_spawned += 1;
            }
        }
        let failed = self.collapse_worker.take_failed_tasks();
        if !failed.is_empty() {
            warn!("Dropped {} collapse check(s) that failed", failed.len());
        }
        self.collapse_worker.process_queued_tasks();
    }

    /// Hands queued chunks to the mesh workers until the work channel is full.
    fn publish_mesh_requests(&mut self) -> usize {
        let mut published = 0;
        while let Some(request) = self.chunks.next_request() {
            let task = ChunkMeshGenerationTask::new(self.world.clone(), request, self.meshing);
            match self.mesh_workers.try_publish(task) {
                Ok(()) => {
                    self.chunks.mark_building(request);
                    published += 1;
                }
                Err(_) => {
                    self.chunks.requeue_front(request);
                    break;
                }
            }
        }
        published
    }

    /// Steps falling structures and particles. Returns how many structures dissolved.
    fn step_bodies(&mut self, dt: f32) -> usize {
        if self.structures.is_empty() && self.particles.is_empty() {
            return 0;
        }

        let height = self.world.size_y() as i32;
        let fall = self.fall;
        let cap = self.config.particles_per_structure;
        let lifetime = self.config.particle_lifetime_secs;
        let mut debris = Vec::new();

        let view = self.world.read();
        let dissolved = self.structures.update(|structure| {
            match structure.update(dt, &view, height, &fall) {
                FallStep::Settled => {
                    debris.extend(structure.dissolve(cap, lifetime));
                    false
                }
                FallStep::Falling | FallStep::Bounced => true,
            }
        });
        self.particles
            .update(|particle| particle.update(dt, &view, height, fall.gravity));
        drop(view);

        for particle in debris {
            self.particles.add(particle);
        }
        if dissolved > 0 {
            log::debug!("{} structure(s) dissolved into debris", dissolved);
        }
        dissolved
    }

    /// Geometry for the damage overlay, rebuilt from the current damage map.
    pub fn damage_overlay(&self) -> Tesselator {
        build_damage_overlay(&self.damage)
    }

    /// Whether no mesh or collapse work is queued, in flight, or waiting to be adopted,
    /// and no chunk is dirty.
    pub fn is_idle(&self) -> bool {
        self.mesh_workers.is_idle()
            && self.collapse_worker.is_idle()
            && self.chunks.is_settled()
            && !self.world.has_dirty_chunks()
    }

    /// Stops and joins every worker thread. Also happens on drop.
    pub fn shutdown(&mut self) {
        self.mesh_workers.shutdown();
        self.collapse_worker.shutdown();
    }
}

/// Keeps the load origin inside the chunk grid, warning when it had to move.
fn clamp_origin(origin: Point2<i32>, chunks_x: usize, chunks_z: usize) -> Point2<i32> {
    let clamped = Point2::new(
        origin.x.clamp(0, chunks_x as i32 - 1),
        origin.y.clamp(0, chunks_z as i32 - 1),
    );
    if clamped != origin {
        warn!("Origin chunk {:?} lies outside the grid, using {:?}", origin, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> EngineConfig {
        EngineConfig {
            world_size: [32, 16, 32],
            chunk_size: 16,
            max_workers: 2,
            ..EngineConfig::default()
        }
    }

    fn run_until_idle(engine: &mut TerrainEngine) -> FrameReport {
        let mut total = FrameReport::default();
        for _ in 0..10_000 {
            let report = engine.update(1.0 / 60.0, Instant::now());
            total.adopted_chunks += report.adopted_chunks;
            total.structures_spawned += report.structures_spawned;
            if engine.is_idle() {
                return total;
            }
            std::thread::yield_now();
        }
        panic!("engine never went idle");
    }

    #[test]
    fn origin_is_clamped_into_the_grid() {
        assert_eq!(clamp_origin(Point2::new(9, -3), 4, 4), Point2::new(3, 0));
        assert_eq!(clamp_origin(Point2::new(1, 2), 4, 4), Point2::new(1, 2));
    }

    #[test]
    fn initial_load_meshes_every_chunk() {
        let mut engine = TerrainEngine::new(small_config()).unwrap();
        let report = run_until_idle(&mut engine);
        assert_eq!(report.adopted_chunks, 4);
        assert!(engine.chunks().chunks().iter().all(|chunk| chunk.created));
        assert!(engine.chunks().is_settled());
    }

    #[test]
    fn clear_region_reports_changed_voxels() {
        let mut engine = TerrainEngine::new(small_config()).unwrap();
        for x in 0..4 {
            engine.apply_edit(EditCommand::SetBlock {
                position: Point3::new(x, 0, 0),
                block: Block::GROUND,
            });
        }
        let changed = engine.apply_edit(EditCommand::ClearRegion {
            min: Point3::new(-5, -5, -5),
            max: Point3::new(2, 0, 0),
        });
        assert_eq!(changed, 3);
        assert!(engine.world().is_solid(3, 0, 0));
    }

    #[test]
    fn out_of_range_durations_fail_construction() {
        let config = EngineConfig {
            damage_decay_secs: 1e30,
            ..small_config()
        };
        assert!(matches!(TerrainEngine::new(config), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn map_with_wrong_dimensions_is_rejected() {
        let mut engine = TerrainEngine::new(small_config()).unwrap();
        let result = engine.load_map(Box::new(DenseColumnStore::with_world_size(16, 16, 16)));
        assert!(matches!(result, Err(EngineError::MapDimensions { .. })));
    }

    #[test]
    fn damage_destroys_once_saturated() {
        let mut engine = TerrainEngine::new(small_config()).unwrap();
        let position = Point3::new(4, 5, 4);
        engine.apply_edit(EditCommand::SetBlock {
            position,
            block: Block::rgb(10, 10, 10),
        });

        let now = Instant::now();
        assert!(!engine.damage_block(position, 60, now));
        assert!(engine.damage_block(position, 60, now));
        assert!(engine.world().is_air(4, 5, 4));
        assert!(!engine.damage_block(position, 60, now));
    }
}
