//! # Engine Configuration
//!
//! Every tunable of the engine in one serde structure. All fields have defaults, so a
//! configuration file only needs to name what it changes:
//!
//! ```json
//! { "world_size": [256, 64, 256], "meshing_mode": "greedy" }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use cgmath::Point2;
use serde::{Deserialize, Serialize};

use super::{
    rendering::meshing::{MeshingMode, MeshingOptions},
    voxels::falling::FallSettings,
    EngineError,
};

/// Longest duration a configuration may name, one day.
pub const MAX_DURATION_SECS: f32 = 86_400.0;

/// Engine settings, loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World extent as `[x, y, z]`, `y` being the height
    pub world_size: [usize; 3],
    /// Side length of a chunk column
    pub chunk_size: usize,
    /// Upper bound on mesh worker threads
    pub max_workers: usize,
    pub meshing_mode: MeshingMode,
    pub ambient_occlusion: bool,
    /// Capacity of the mesh work channel
    pub work_channel_capacity: usize,
    /// Capacity of the mesh result channel
    pub result_channel_capacity: usize,
    /// Capacity of both collapse channels
    pub collapse_channel_capacity: usize,
    /// Chunk the initial load starts from, `[cx, cy]`
    pub origin_chunk: [i32; 2],
    /// Voxels per second squared
    pub gravity: f32,
    /// Fraction of speed a falling structure keeps after a bounce
    pub bounce: f32,
    /// Vertical speed below which a bouncing structure dissolves
    pub rest_speed: f32,
    pub damage_decay_secs: f32,
    pub destroy_cooldown_secs: f32,
    pub particle_lifetime_secs: f32,
    /// Maximum particles a dissolving structure leaves behind
    pub particles_per_structure: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let fall = FallSettings::default();
        EngineConfig {
            world_size: [512, 64, 512],
            chunk_size: 64,
            max_workers: 8,
            meshing_mode: MeshingMode::Naive,
            ambient_occlusion: true,
            work_channel_capacity: 64,
            result_channel_capacity: 64,
            collapse_channel_capacity: 256,
            origin_chunk: [0, 0],
            gravity: fall.gravity,
            bounce: fall.bounce,
            rest_speed: fall.rest_speed,
            damage_decay_secs: 10.0,
            destroy_cooldown_secs: 5.0,
            particle_lifetime_secs: 2.0,
            particles_per_structure: 64,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |message: String| Err(EngineError::InvalidConfig(message));
        let [size_x, size_y, size_z] = self.world_size;

        if size_x == 0 || size_y == 0 || size_z == 0 {
            return invalid(format!("world size {:?} has a zero extent", self.world_size));
        }
        if self.chunk_size == 0 {
            return invalid("chunk size must be positive".to_string());
        }
        if size_x % self.chunk_size != 0 || size_z % self.chunk_size != 0 {
            return invalid(format!(
                "world size {}x{} is not a multiple of the chunk size {}",
                size_x, size_z, self.chunk_size
            ));
        }
        if self.work_channel_capacity == 0
            || self.result_channel_capacity == 0
            || self.collapse_channel_capacity == 0
        {
            return invalid("channel capacities must be positive".to_string());
        }
        let physics = [self.gravity, self.bounce, self.rest_speed];
        if physics.iter().any(|value| !value.is_finite()) {
            return invalid(format!("gravity, bounce and rest speed must be finite, got {:?}", physics));
        }
        if self.gravity < 0.0 || !(0.0..=1.0).contains(&self.bounce) || self.rest_speed < 0.0 {
            return invalid("gravity, bounce and rest speed must be non-negative, bounce at most 1".to_string());
        }
        for (name, secs) in [
            ("damage_decay_secs", self.damage_decay_secs),
            ("destroy_cooldown_secs", self.destroy_cooldown_secs),
            ("particle_lifetime_secs", self.particle_lifetime_secs),
        ] {
            if !(0.0..=MAX_DURATION_SECS).contains(&secs) {
                return invalid(format!("{} must lie in [0, {}], got {}", name, MAX_DURATION_SECS, secs));
            }
        }
        Ok(())
    }

    /// Number of chunks along `x` and `z`.
    pub fn chunks_per_axis(&self) -> (usize, usize) {
        (
            self.world_size[0] / self.chunk_size,
            self.world_size[2] / self.chunk_size,
        )
    }

    pub fn origin_chunk(&self) -> Point2<i32> {
        Point2::new(self.origin_chunk[0], self.origin_chunk[1])
    }

    pub fn meshing_options(&self) -> MeshingOptions {
        MeshingOptions {
            mode: self.meshing_mode,
            ambient_occlusion: self.ambient_occlusion,
        }
    }

    pub fn fall_settings(&self) -> FallSettings {
        FallSettings {
            gravity: self.gravity,
            bounce: self.bounce,
            rest_speed: self.rest_speed,
        }
    }

    /// Saturates instead of failing for values `validate` would reject.
    pub fn damage_decay(&self) -> Duration {
        seconds(self.damage_decay_secs)
    }

    pub fn destroy_cooldown(&self) -> Duration {
        seconds(self.destroy_cooldown_secs)
    }
}

fn seconds(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs.clamp(0.0, MAX_DURATION_SECS)).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chunks_per_axis(), (8, 8));
        assert_eq!(config.damage_decay(), Duration::from_secs(10));
        assert_eq!(config.destroy_cooldown(), Duration::from_secs(5));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "world_size": [128, 32, 64], "meshing_mode": "greedy" }"#).unwrap();
        assert_eq!(config.world_size, [128, 32, 64]);
        assert_eq!(config.meshing_mode, MeshingMode::Greedy);
        assert_eq!(config.chunk_size, 64);
        assert!(config.ambient_occlusion);
    }

    #[test]
    fn rejects_unaligned_world() {
        let result = EngineConfig::from_json(r#"{ "world_size": [100, 32, 64] }"#);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = EngineConfig {
            work_channel_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_durations_out_of_range() {
        for json in [
            r#"{ "damage_decay_secs": 1e30 }"#,
            r#"{ "destroy_cooldown_secs": -1.0 }"#,
            r#"{ "particle_lifetime_secs": 1e30 }"#,
        ] {
            let result = EngineConfig::from_json(json);
            assert!(matches!(result, Err(EngineError::InvalidConfig(_))), "{} was accepted", json);
        }
    }

    #[test]
    fn rejects_non_finite_physics() {
        let config = EngineConfig {
            gravity: f32::INFINITY,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        let config = EngineConfig {
            rest_speed: f32::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_durations_saturate_instead_of_panicking() {
        let config = EngineConfig {
            damage_decay_secs: 1e30,
            destroy_cooldown_secs: f32::NAN,
            ..EngineConfig::default()
        };
        assert_eq!(config.damage_decay(), Duration::from_secs_f32(MAX_DURATION_SECS));
        assert_eq!(config.destroy_cooldown(), Duration::ZERO);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(EngineConfig::from_json("{ nope"), Err(EngineError::Config(_))));
    }
}
