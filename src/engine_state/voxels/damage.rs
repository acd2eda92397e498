//! # Damage Map
//!
//! Transient per-voxel damage. Hits accumulate into a value that saturates at
//! [`DAMAGE_MAX`]; entries decay away after a period without hits or once their voxel
//! has become air. Reaching full damage does not remove anything by itself: callers
//! ask [`DamageMap::try_destroy_action`], which is rate limited per voxel, before
//! issuing the clearing edit.
//!
//! All operations take an explicit `now`, so callers (and tests) control the clock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cgmath::Point3;
use web_time::Instant;

use super::world::World;

/// Saturation value of accumulated damage.
pub const DAMAGE_MAX: u8 = 100;
/// Default time without hits after which an entry is evicted.
pub const DEFAULT_DECAY: Duration = Duration::from_secs(10);
/// Default minimum spacing between two destroy actions on one voxel.
pub const DEFAULT_DESTROY_COOLDOWN: Duration = Duration::from_secs(5);

/// Damage state of one voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamagedVoxel {
    /// Accumulated damage, `0..=DAMAGE_MAX`
    pub damage: u8,
    /// Time of the most recent hit
    pub last_hit: Instant,
    /// Time the destroy action last fired for this voxel
    pub last_destroy_action: Option<Instant>,
}

/// Map from voxel coordinate to damage state, guarded by its own mutex.
#[derive(Debug)]
pub struct DamageMap {
    entries: Mutex<HashMap<Point3<i32>, DamagedVoxel>>,
    decay: Duration,
    destroy_cooldown: Duration,
}

impl Default for DamageMap {
    fn default() -> Self {
        DamageMap::new(DEFAULT_DECAY, DEFAULT_DESTROY_COOLDOWN)
    }
}

impl DamageMap {
    /// Creates an empty map with the given decay and destroy cooldown.
    pub fn new(decay: Duration, destroy_cooldown: Duration) -> Self {
        DamageMap {
            entries: Mutex::new(HashMap::new()),
            decay,
            destroy_cooldown,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Point3<i32>, DamagedVoxel>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `amount` damage to the voxel at `position` and refreshes its hit time.
    ///
    /// # Returns
    /// The voxel's damage after the hit, saturated at [`DAMAGE_MAX`].
    pub fn apply_damage(&self, position: Point3<i32>, amount: u8, now: Instant) -> u8 {
        let mut entries = self.entries();
        let entry = entries.entry(position).or_insert(DamagedVoxel {
            damage: 0,
            last_hit: now,
            last_destroy_action: None,
        });
        entry.damage = entry.damage.saturating_add(amount).min(DAMAGE_MAX);
        entry.last_hit = now;
        entry.damage
    }

    /// Current damage of the voxel at `position`, zero if untracked.
    pub fn damage_at(&self, position: Point3<i32>) -> u8 {
        self.entries()
            .get(&position)
            .map(|entry| entry.damage)
            .unwrap_or(0)
    }

    /// Full state of the voxel at `position`, if tracked.
    pub fn get(&self, position: Point3<i32>) -> Option<DamagedVoxel> {
        self.entries().get(&position).copied()
    }

    /// Whether the voxel at `position` may be destroyed now.
    ///
    /// Returns `true` only while the voxel's damage is saturated, and then at most
    /// once per destroy cooldown. A `true` result starts a new cooldown.
    pub fn try_destroy_action(&self, position: Point3<i32>, now: Instant) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(&position) else {
            return false;
        };
        if entry.damage < DAMAGE_MAX {
            return false;
        }
        let cooled_down = entry
            .last_destroy_action
            .map_or(true, |last| now.duration_since(last) >= self.destroy_cooldown);
        if cooled_down {
            entry.last_destroy_action = Some(now);
        }
        cooled_down
    }

    /// Evicts stale entries.
    ///
    /// An entry goes once its last hit is older than the decay period or its voxel has
    /// become air. Entries still inside a destroy cooldown survive with their damage
    /// reset, so a rebuilt voxel cannot be destroyed again before the cooldown ends.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn tick(&self, now: Instant, world: &World) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        let decay = self.decay;
        let cooldown = self.destroy_cooldown;

        entries.retain(|position, entry| {
            let stale = now.duration_since(entry.last_hit) > decay
                || world.is_air(position.x, position.y, position.z);
            if !stale {
                return true;
            }
            let cooling = entry
                .last_destroy_action
                .is_some_and(|last| now.duration_since(last) < cooldown);
            if cooling {
                entry.damage = 0;
            }
            cooling
        });

        before - entries.len()
    }

    /// Positions and damage values of every tracked voxel.
    pub fn snapshot(&self) -> Vec<(Point3<i32>, u8)> {
        self.entries()
            .iter()
            .map(|(position, entry)| (*position, entry.damage))
            .collect()
    }

    /// Number of tracked voxels.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Forgets every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }
}
