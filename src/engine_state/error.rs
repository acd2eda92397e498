//! Crate error type.

use thiserror::Error;

use super::voxels::store::StoreDimensions;

/// Errors returned by the fallible outer operations of the engine: loading
/// configuration, starting workers, replacing the map, exporting the minimap.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("could not encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("map dimensions {found:?} do not match the engine's {expected:?}")]
    MapDimensions {
        expected: StoreDimensions,
        found: StoreDimensions,
    },
}
