//! # Chunk Module
//!
//! The world is partitioned into square columns of `chunk_size × chunk_size` voxels,
//! the unit of mesh rebuilding. This module owns the per-chunk bookkeeping: state,
//! live mesh, maximum height, and the queue of chunks waiting for a mesh worker.
//!
//! ## State Machine
//!
//! ```text
//! Empty ──enqueue──▶ Queued ──publish──▶ Building ──adopt latest──▶ Meshed
//!                      ▲                                              │
//!                      └──────────────────── enqueue ─────────────────┘
//! ```
//!
//! Enqueueing a chunk that is already `Queued` does nothing, so any number of edits
//! between two publishes collapse into one rebuild. A build that fails is abandoned:
//! the chunk drops back to `Meshed` or `Empty` until it is enqueued again.
//!
//! ## Recency
//!
//! Every published request takes a generation from one grid-wide counter. Results can
//! complete out of order; adoption keeps, per chunk and per drain, only the result with
//! the greatest generation, and only if it is newer than the mesh already live. The
//! chunk becomes `Meshed` when the adopted generation is the latest one requested.

use std::collections::VecDeque;

use cgmath::Point2;
use log::debug;

use crate::engine_state::rendering::{
    meshing::tesselator::Tesselator,
    tasks::chunk_mesh_generation_task::{MeshBuildRequest, MeshBuildResult},
};

use super::block::Block;

/// Lifecycle of a chunk's mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Never built
    Empty,
    /// Waiting for a worker
    Queued,
    /// A request is in flight
    Building,
    /// The live mesh reflects the latest request
    Meshed,
}

/// One chunk column of the world.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk grid coordinates `(cx, cy)`
    pub position: Point2<i32>,
    pub state: ChunkState,
    /// Whether a mesh has ever been adopted
    pub created: bool,
    /// Tallest solid voxel, from the last adopted build
    pub max_height: Option<i32>,
    /// The live mesh
    pub mesh: Option<Tesselator>,
    requested_generation: u64,
    adopted_generation: u64,
    updated: bool,
}

impl Chunk {
    fn new(position: Point2<i32>) -> Self {
        Chunk {
            position,
            state: ChunkState::Empty,
            created: false,
            max_height: None,
            mesh: None,
            requested_generation: 0,
            adopted_generation: 0,
            updated: false,
        }
    }

    /// Generation of the most recent request for this chunk.
    pub fn requested_generation(&self) -> u64 {
        self.requested_generation
    }

    /// Generation of the live mesh.
    pub fn adopted_generation(&self) -> u64 {
        self.adopted_generation
    }
}

/// What one adoption pass did.
#[derive(Debug, Default)]
pub struct Adoption {
    /// Adopted chunks with their minimap strips
    pub strips: Vec<(Point2<i32>, Vec<Block>)>,
    /// Results discarded because a newer one was already live or in the same drain
    pub stale: usize,
}

/// All chunks of the world plus the rebuild queue.
#[derive(Debug)]
pub struct ChunkGrid {
    chunks: Vec<Chunk>,
    chunks_x: i32,
    chunks_z: i32,
    chunk_size: usize,
    pending: VecDeque<Point2<i32>>,
    next_generation: u64,
}

impl ChunkGrid {
    /// Pre-allocates `chunks_x × chunks_z` empty chunks.
    pub fn new(chunks_x: usize, chunks_z: usize, chunk_size: usize) -> Self {
        let mut chunks = Vec::with_capacity(chunks_x * chunks_z);
        for cy in 0..chunks_z as i32 {
            for cx in 0..chunks_x as i32 {
                chunks.push(Chunk::new(Point2::new(cx, cy)));
            }
        }

        ChunkGrid {
            chunks,
            chunks_x: chunks_x as i32,
            chunks_z: chunks_z as i32,
            chunk_size,
            pending: VecDeque::new(),
            next_generation: 0,
        }
    }

    pub fn chunks_x(&self) -> usize {
        self.chunks_x as usize
    }

    pub fn chunks_z(&self) -> usize {
        self.chunks_z as usize
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn index(&self, position: Point2<i32>) -> Option<usize> {
        let inside = (0..self.chunks_x).contains(&position.x) && (0..self.chunks_z).contains(&position.y);
        inside.then(|| (position.y * self.chunks_x + position.x) as usize)
    }

    pub fn get(&self, position: Point2<i32>) -> Option<&Chunk> {
        self.index(position).map(|index| &self.chunks[index])
    }

    fn get_mut(&mut self, position: Point2<i32>) -> Option<&mut Chunk> {
        self.index(position).map(move |index| &mut self.chunks[index])
    }

    /// Every chunk, row by row.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks with a live mesh.
    pub fn live_mesh_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.mesh.is_some()).count()
    }

    /// Number of chunks waiting for a worker.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Every chunk ordered outward from `origin`: by Manhattan distance, ties broken
    /// by `(cx, cy)`.
    pub fn ring_order(&self, origin: Point2<i32>) -> Vec<Point2<i32>> {
        let mut order: Vec<Point2<i32>> = self.chunks.iter().map(|chunk| chunk.position).collect();
        order.sort_by_key(|position| {
            let distance = (position.x - origin.x).abs() + (position.y - origin.y).abs();
            (distance, position.x, position.y)
        });
        order
    }

    /// Queues a chunk for rebuilding.
    ///
    /// # Returns
    /// `false` if the chunk was already queued or lies outside the grid.
    pub fn enqueue(&mut self, position: Point2<i32>) -> bool {
        let Some(chunk) = self.get_mut(position) else {
            return false;
        };
        if chunk.state == ChunkState::Queued {
            return false;
        }
        chunk.state = ChunkState::Queued;
        self.pending.push_back(position);
        true
    }

    /// Queues every chunk in ring order around `origin`.
    pub fn enqueue_all(&mut self, origin: Point2<i32>) -> usize {
        let order = self.ring_order(origin);
        order.into_iter().filter(|position| self.enqueue(*position)).count()
    }

    /// Takes the next queued chunk and stamps a new generation on it.
    ///
    /// The chunk stays `Queued` until `mark_building` confirms the request reached a
    /// worker; if it could not be published, hand it back with `requeue_front`.
    pub fn next_request(&mut self) -> Option<MeshBuildRequest> {
        let chunk = self.pending.pop_front()?;
        self.next_generation += 1;
        Some(MeshBuildRequest {
            chunk,
            generation: self.next_generation,
        })
    }

    /// Records that `request` was handed to a worker.
    pub fn mark_building(&mut self, request: MeshBuildRequest) {
        if let Some(chunk) = self.get_mut(request.chunk) {
            chunk.requested_generation = request.generation;
            chunk.state = ChunkState::Building;
        }
    }

    /// Puts back a request that could not be published. It goes first in line.
    pub fn requeue_front(&mut self, request: MeshBuildRequest) {
        self.pending.push_front(request.chunk);
    }

    /// Gives up on a request whose build failed.
    ///
    /// A chunk still waiting on exactly that request leaves `Building`: back to
    /// `Meshed` if an older mesh is live, otherwise `Empty`. The next edit queues it
    /// again.
    pub fn abandon(&mut self, request: MeshBuildRequest) {
        let Some(chunk) = self.get_mut(request.chunk) else {
            return;
        };
        if chunk.state != ChunkState::Building || chunk.requested_generation != request.generation {
            return;
        }
        chunk.state = if chunk.mesh.is_some() {
            ChunkState::Meshed
        } else {
            ChunkState::Empty
        };
        debug!("Abandoned build {} of chunk {:?}", request.generation, request.chunk);
    }

    /// Adopts a batch of drained results.
    ///
    /// For each chunk only the newest result of the batch is considered, and only if it
    /// is newer than the live mesh. Everything else is counted as stale and dropped.
    pub fn adopt(&mut self, mut results: Vec<MeshBuildResult>) -> Adoption {
        for chunk in &mut self.chunks {
            chunk.updated = false;
        }
        results.sort_by(|a, b| b.generation.cmp(&a.generation));

        let mut adoption = Adoption::default();
        for result in results {
            let Some(chunk) = self.get_mut(result.chunk) else {
                adoption.stale += 1;
                continue;
            };
            if chunk.updated || result.generation <= chunk.adopted_generation {
                adoption.stale += 1;
                continue;
            }

            chunk.updated = true;
            chunk.created = true;
            chunk.adopted_generation = result.generation;
            chunk.max_height = result.max_height;
            chunk.mesh = Some(result.mesh);
            if result.generation >= chunk.requested_generation && chunk.state == ChunkState::Building {
                chunk.state = ChunkState::Meshed;
            }
            adoption.strips.push((result.chunk, result.minimap));
        }

        if adoption.stale > 0 {
            debug!("Discarded {} stale mesh result(s)", adoption.stale);
        }
        adoption
    }

    /// Returns every chunk to `Empty` and drops all meshes and queued work.
    ///
    /// Generations keep counting, and every result issued before the reset is treated
    /// as stale.
    pub fn reset(&mut self) {
        let floor = self.next_generation;
        for chunk in &mut self.chunks {
            chunk.state = ChunkState::Empty;
            chunk.created = false;
            chunk.max_height = None;
            chunk.mesh = None;
            chunk.requested_generation = floor;
            chunk.adopted_generation = floor;
            chunk.updated = false;
        }
        self.pending.clear();
    }

    /// Whether every chunk's live mesh answers its latest request and nothing waits.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty() && self.chunks.iter().all(|chunk| chunk.state != ChunkState::Building)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(chunk: Point2<i32>, generation: u64, quads: usize) -> MeshBuildResult {
        let mut mesh = Tesselator::new();
        for _ in 0..quads {
            mesh.add_quad(
                [cgmath::Point3::new(0.0, 0.0, 0.0); 4],
                [[0; 4]; 4],
                cgmath::Vector3::new(0, 1, 0),
            );
        }
        MeshBuildResult {
            chunk,
            generation,
            max_height: Some(quads as i32),
            mesh,
            minimap: Vec::new(),
        }
    }

    fn publish_all(grid: &mut ChunkGrid) -> Vec<MeshBuildRequest> {
        let mut requests = Vec::new();
        while let Some(request) = grid.next_request() {
            grid.mark_building(request);
            requests.push(request);
        }
        requests
    }

    #[test]
    fn ring_order_starts_at_the_origin() {
        let grid = ChunkGrid::new(3, 3, 8);
        let order = grid.ring_order(Point2::new(1, 1));
        assert_eq!(order[0], Point2::new(1, 1));
        assert_eq!(
            &order[1..5],
            &[
                Point2::new(0, 1),
                Point2::new(1, 0),
                Point2::new(1, 2),
                Point2::new(2, 1)
            ]
        );
        assert_eq!(order.len(), 9);
    }

    #[test]
    fn queued_chunks_are_coalesced() {
        let mut grid = ChunkGrid::new(2, 2, 8);
        assert!(grid.enqueue(Point2::new(0, 0)));
        assert!(!grid.enqueue(Point2::new(0, 0)));
        assert!(!grid.enqueue(Point2::new(5, 0)));
        assert_eq!(grid.pending_len(), 1);
    }

    #[test]
    fn newest_result_wins_regardless_of_arrival_order() {
        let mut grid = ChunkGrid::new(1, 1, 8);
        let chunk = Point2::new(0, 0);

        grid.enqueue(chunk);
        let first = publish_all(&mut grid)[0];
        grid.enqueue(chunk);
        let second = publish_all(&mut grid)[0];
        assert!(second.generation > first.generation);

        // Both arrive in one drain, newest first or last.
        let adoption = grid.adopt(vec![result(chunk, first.generation, 1), result(chunk, second.generation, 2)]);
        assert_eq!(adoption.stale, 1);
        assert_eq!(adoption.strips.len(), 1);
        let live = grid.get(chunk).unwrap();
        assert_eq!(live.mesh.as_ref().unwrap().quad_count(), 2);
        assert_eq!(live.state, ChunkState::Meshed);
    }

    #[test]
    fn straggler_never_replaces_a_newer_mesh() {
        let mut grid = ChunkGrid::new(1, 1, 8);
        let chunk = Point2::new(0, 0);

        grid.enqueue(chunk);
        let first = publish_all(&mut grid)[0];
        grid.enqueue(chunk);
        let second = publish_all(&mut grid)[0];

        grid.adopt(vec![result(chunk, second.generation, 2)]);
        let adoption = grid.adopt(vec![result(chunk, first.generation, 1)]);

        assert_eq!(adoption.stale, 1);
        assert_eq!(grid.get(chunk).unwrap().mesh.as_ref().unwrap().quad_count(), 2);
    }

    #[test]
    fn older_result_is_shown_but_chunk_keeps_building() {
        let mut grid = ChunkGrid::new(1, 1, 8);
        let chunk = Point2::new(0, 0);

        grid.enqueue(chunk);
        let first = publish_all(&mut grid)[0];
        grid.enqueue(chunk);
        publish_all(&mut grid);

        grid.adopt(vec![result(chunk, first.generation, 1)]);
        let live = grid.get(chunk).unwrap();
        assert!(live.created);
        assert_eq!(live.state, ChunkState::Building);
        assert!(!grid.is_settled());
    }

    #[test]
    fn abandoned_build_settles_the_chunk() {
        let mut grid = ChunkGrid::new(2, 1, 8);
        let (fresh, meshed) = (Point2::new(0, 0), Point2::new(1, 0));

        grid.enqueue(meshed);
        let first = publish_all(&mut grid)[0];
        grid.adopt(vec![result(meshed, first.generation, 2)]);

        grid.enqueue(fresh);
        grid.enqueue(meshed);
        let failed = publish_all(&mut grid);
        assert!(!grid.is_settled());

        for request in failed {
            grid.abandon(request);
        }
        assert!(grid.is_settled());
        assert_eq!(grid.get(fresh).unwrap().state, ChunkState::Empty);
        let kept = grid.get(meshed).unwrap();
        assert_eq!(kept.state, ChunkState::Meshed);
        assert_eq!(kept.mesh.as_ref().unwrap().quad_count(), 2);
    }

    #[test]
    fn abandoning_a_superseded_request_keeps_building() {
        let mut grid = ChunkGrid::new(1, 1, 8);
        let chunk = Point2::new(0, 0);

        grid.enqueue(chunk);
        let first = publish_all(&mut grid)[0];
        grid.enqueue(chunk);
        publish_all(&mut grid);

        grid.abandon(first);
        assert_eq!(grid.get(chunk).unwrap().state, ChunkState::Building);
        assert!(!grid.is_settled());
    }

    #[test]
    fn reset_makes_in_flight_results_stale() {
        let mut grid = ChunkGrid::new(2, 1, 8);
        grid.enqueue_all(Point2::new(0, 0));
        let requests = publish_all(&mut grid);

        grid.reset();
        let adoption = grid.adopt(requests.iter().map(|request| result(request.chunk, request.generation, 1)).collect());

        assert_eq!(adoption.stale, 2);
        assert_eq!(grid.live_mesh_count(), 0);
        assert!(grid.chunks().iter().all(|chunk| chunk.state == ChunkState::Empty));
    }

    #[test]
    fn requeued_request_goes_first() {
        let mut grid = ChunkGrid::new(2, 1, 8);
        grid.enqueue(Point2::new(1, 0));
        grid.enqueue(Point2::new(0, 0));

        let request = grid.next_request().unwrap();
        grid.requeue_front(request);
        assert_eq!(grid.next_request().unwrap().chunk, Point2::new(1, 0));
    }
}
