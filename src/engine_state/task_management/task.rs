//! # Task Trait
//!
//! A `Task` is a self-contained unit of work executed on a background worker. It owns
//! (or shares through an `Arc`) everything it needs, runs once, and produces an output
//! value that travels back to the main thread through the pool's result channel.
//!
//! ## Task Lifecycle
//! 1. The main thread publishes a task via `WorkerPool::publish_task()`
//! 2. A worker takes it off the work channel and calls `process()`
//! 3. The output is put on the result channel; a task that panics goes back instead
//! 4. The main thread collects outputs in `WorkerPool::process_completed_tasks()`
//!    and adopts them
//!
//! ## Thread Safety
//! - Tasks must be `Send` to reach a worker
//! - Outputs must be `Send` to travel back
//! - Shared state reached from `process()` must be synchronized (the voxel store is
//!   behind its reader/writer lock)

/// A unit of work that can be executed on a background worker.
///
/// # Implementation Guidelines
/// - Should be coarse-grained; one chunk rebuild or one connectivity search
/// - Must not hold the voxel store lock longer than a bulk copy; long searches read
///   voxel by voxel
/// - Should not block on the pool's own channels
pub trait Task: Send + 'static {
    /// What the task hands back to the main thread.
    type Output: Send + 'static;

    /// Performs the work. Runs on a worker thread.
    ///
    /// # Returns
    /// The value the main thread adopts. Tasks that find nothing to do still return
    /// an output describing that, so the pool's in-flight accounting stays exact.
    fn process(&self) -> Self::Output;
}
