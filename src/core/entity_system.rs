//! # Entity System
//!
//! A thread-safe growable array of homogeneous records. It backs the short-lived
//! per-frame objects of the terrain engine: falling structures and debris particles.
//!
//! Records are appended from any thread and updated by the main thread with a
//! predicate that decides, record by record, whether it survives the frame.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-guarded list of entities of one type.
///
/// # Examples
///
/// ```
/// use voxel_terrain::core::EntitySystem;
///
/// let particles = EntitySystem::new();
/// particles.add(3.0_f32);
/// particles.add(0.5_f32);
///
/// // Age every particle and drop the ones that expired.
/// particles.update(|ttl| {
///     *ttl -= 1.0;
///     *ttl > 0.0
/// });
/// assert_eq!(particles.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct EntitySystem<T> {
    entities: Mutex<Vec<T>>,
}

impl<T> EntitySystem<T> {
    /// Creates an empty entity system.
    pub fn new() -> Self {
        EntitySystem {
            entities: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entity. Safe to call while another thread is iterating.
    pub fn add(&self, entity: T) {
        self.lock().push(entity);
    }

    /// Visits every entity mutably and removes those for which `keep` returns `false`.
    ///
    /// Returns the number of entities removed.
    pub fn update<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&mut T) -> bool,
    {
        let mut entities = self.lock();
        let before = entities.len();
        entities.retain_mut(|entity| keep(entity));
        before - entities.len()
    }

    /// Visits every entity immutably, in insertion order.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&T),
    {
        for entity in self.lock().iter() {
            visit(entity);
        }
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entity is alive.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes every entity.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
