//! # Task Management System
//!
//! This module runs work on a supervised pool of background threads. The engine uses
//! one pool for chunk mesh building and a single-thread pool for collapse connectivity
//! searches.
//!
//! ## Architecture Overview
//!
//! - `WorkerPool`: owns the worker threads, a bounded work channel and a bounded result
//!   channel, plus a main-thread overflow queue
//! - `Task`: a unit of work with an associated output type (see `task`)
//! - `WorkItem`: what travels on the work channel; either a job or a stop sentinel
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `WorkerPool::publish_task()`; when the work channel is
//!    full they wait in `queued_tasks` instead of blocking the caller
//! 2. Workers block on the work channel, process a task and put the output on the
//!    result channel
//! 3. Outputs are collected on the main thread in `process_completed_tasks()`
//! 4. `process_queued_tasks()` moves waiting tasks onto the work channel as it drains
//!
//! A task whose processing panics travels back on the result channel instead of an
//! output. The owner picks it up with `take_failed_tasks()` and repairs whatever it
//! expected the output to do.
//!
//! The main thread never blocks on either channel. Workers may block on a full result
//! channel until the main thread's next drain.
//!
//! ## Shutdown
//! `shutdown()` (also run on drop) discards pending work, feeds every worker a
//! `WorkItem::Stop`, and joins the threads.
//!
//! ## Example Usage
//! ```rust
//! use voxel_terrain::engine_state::task_management::{task::Task, WorkerPool};
//!
//! struct Square(u64);
//!
//! impl Task for Square {
//!     type Output = u64;
//!     fn process(&self) -> u64 {
//!         self.0 * self.0
//!     }
//! }
//!
//! let mut pool = WorkerPool::new("square", 2, 4, 4).unwrap();
//! for n in 0..10 {
//!     pool.publish_task(Square(n));
//! }
//!
//! let mut total = 0;
//! while !pool.is_idle() {
//!     pool.process_queued_tasks();
//!     total += pool.process_completed_tasks().into_iter().sum::<u64>();
//! }
//! assert_eq!(total, 285);
//! ```

pub mod task;

use log::{debug, error, info};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use task::Task;

use crate::core::Channel;
use crate::engine_state::EngineError;

/// What travels on a pool's work channel.
#[derive(Debug)]
pub enum WorkItem<T> {
    /// A task to process
    Job(T),
    /// Tells the receiving worker to exit its loop
    Stop,
}

/// Number of mesh workers to start: half the available cores, clamped to
/// `1..=max_workers`.
pub fn worker_count(max_workers: usize) -> usize {
    let parallelism = thread::available_parallelism()
        .map(|cores| cores.get())
        .unwrap_or(1);
    (parallelism / 2).clamp(1, max_workers.max(1))
}

/// A supervised pool of worker threads fed through bounded channels.
///
/// # Fields
/// - `work`: tasks waiting for a worker, plus stop sentinels at shutdown
/// - `results`: finished outputs, or the task itself when its processing panicked
/// - `queued_tasks`: overflow kept on the main thread while `work` is full
/// - `failed_tasks`: collected tasks that panicked, until the owner takes them
/// - `num_tasks_in_flight`: tasks handed to `work` whose output has not been collected
pub struct WorkerPool<T: Task> {
    name: &'static str,
    work: Arc<Channel<WorkItem<T>>>,
    results: Arc<Channel<Result<T::Output, T>>>,
    queued_tasks: VecDeque<T>,
    failed_tasks: Vec<T>,
    num_tasks_in_flight: usize,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Task> WorkerPool<T> {
    /// Starts a pool of `num_workers` threads.
    ///
    /// # Arguments
    /// * `name` - Prefix for the worker thread names, also used in log lines
    /// * `num_workers` - Number of threads; zero is raised to one
    /// * `work_capacity` - Capacity of the work channel
    /// * `result_capacity` - Capacity of the result channel
    ///
    /// # Returns
    /// The running pool, or the I/O error from a failed thread spawn.
    pub fn new(
        name: &'static str,
        num_workers: usize,
        work_capacity: usize,
        result_capacity: usize,
    ) -> Result<Self, EngineError> {
        let num_workers = num_workers.max(1);
        let work = Arc::new(Channel::<WorkItem<T>>::new(work_capacity));
        let results = Arc::new(Channel::<Result<T::Output, T>>::new(result_capacity));

        info!(
            "Starting {} {} worker(s), available parallelism: {:?}",
            num_workers,
            name,
            thread::available_parallelism()
        );

        let mut workers = Vec::with_capacity(num_workers);
        for index in 0..num_workers {
            let work = work.clone();
            let results = results.clone();

            let task_closure = move || {
                while let Some(WorkItem::Job(task)) = work.await_item() {
                    match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
                        Ok(output) => results.put(Ok(output)),
                        Err(_) => {
                            error!("{} worker {} returns a task that panicked", name, index);
                            results.put(Err(task));
                        }
                    }
                }
                debug!("{} worker {} exiting", name, index);
            };

            let worker = thread::Builder::new()
                .name(format!("{}-worker-{}", name, index))
                .spawn(task_closure)?;
            workers.push(worker);
        }

        Ok(WorkerPool {
            name,
            work,
            results,
            queued_tasks: VecDeque::new(),
            failed_tasks: Vec::new(),
            num_tasks_in_flight: 0,
            workers,
        })
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Tasks handed to the workers whose outputs have not been collected yet.
    pub fn num_tasks_in_flight(&self) -> usize {
        self.num_tasks_in_flight
    }

    /// Tasks still waiting on the main thread for room in the work channel.
    pub fn num_queued_tasks(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Whether no task is queued, in flight, or waiting to be collected.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.num_tasks_in_flight == 0
    }

    /// Tries to put `task` on the work channel without blocking.
    ///
    /// # Returns
    /// - `Ok(())` if a worker will pick the task up
    /// - `Err(task)` if the work channel is full
    pub fn try_publish(&mut self, task: T) -> Result<(), T> {
        match self.work.try_put(WorkItem::Job(task)) {
            Ok(()) => {
                self.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(WorkItem::Job(task)) => Err(task),
            Err(WorkItem::Stop) => unreachable!("only jobs are published"),
        }
    }

    /// Publishes a task for background execution.
    ///
    /// The task goes straight to the work channel when there is room and nothing is
    /// queued ahead of it; otherwise it waits in `queued_tasks`, preserving order.
    ///
    /// # Returns
    /// - `true` if the task was handed to the workers immediately
    /// - `false` if it was queued
    pub fn publish_task(&mut self, task: T) -> bool {
        if !self.queued_tasks.is_empty() {
            self.queued_tasks.push_back(task);
            return false;
        }

        match self.try_publish(task) {
            Ok(()) => true,
            Err(task) => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Moves queued tasks onto the work channel until it is full.
    ///
    /// # Returns
    /// How many tasks were handed to the workers.
    pub fn process_queued_tasks(&mut self) -> usize {
        let mut published = 0;
        while let Some(task) = self.queued_tasks.pop_front() {
            match self.try_publish(task) {
                Ok(()) => published += 1,
                Err(task) => {
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
        published
    }

    /// Collects every output available right now, in completion order.
    ///
    /// Tasks that panicked are accounted for and set aside for `take_failed_tasks`.
    pub fn process_completed_tasks(&mut self) -> Vec<T::Output> {
        let completed = self.results.drain();
        self.num_tasks_in_flight = self.num_tasks_in_flight.saturating_sub(completed.len());

        let mut outputs = Vec::with_capacity(completed.len());
        for result in completed {
            match result {
                Ok(output) => outputs.push(output),
                Err(task) => self.failed_tasks.push(task),
            }
        }
        outputs
    }

    /// Hands over the tasks that panicked since the last call.
    pub fn take_failed_tasks(&mut self) -> Vec<T> {
        std::mem::take(&mut self.failed_tasks)
    }

    /// Discards every task that has not started and every uncollected output.
    ///
    /// Tasks already being processed still deliver their outputs later.
    ///
    /// # Returns
    /// How many queued or unstarted tasks were dropped.
    pub fn clear(&mut self) -> usize {
        let queued = self.queued_tasks.len();
        self.queued_tasks.clear();
        self.failed_tasks.clear();
        let unstarted = self.work.clear();
        let uncollected = self.results.clear();
        self.num_tasks_in_flight = self
            .num_tasks_in_flight
            .saturating_sub(unstarted + uncollected);
        queued + unstarted
    }

    /// Stops and joins every worker. Pending work is discarded.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        self.clear();
        while self.workers.iter().any(|worker| !worker.is_finished()) {
            // Each stop sentinel ends exactly one worker loop; keep offering them and keep
            // the result channel empty so no worker stays blocked on a put.
            let _ = self.work.try_put(WorkItem::Stop);
            self.results.clear();
            thread::sleep(Duration::from_millis(1));
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("{} worker panicked during shutdown", self.name);
            }
        }
        self.work.clear();
        self.results.clear();
        self.num_tasks_in_flight = 0;
        info!("{} workers stopped", self.name);
    }
}

impl<T: Task> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
