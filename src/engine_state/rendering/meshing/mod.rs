//! Conversion of voxel neighbourhoods into renderable geometry.
//!
//! Two meshers are available, selected per engine through [`MeshingOptions`]:
//! - `naive`: one quad per exposed voxel face, with optional per-corner ambient occlusion
//! - `greedy`: the same face set, with coplanar faces of equal color merged into
//!   larger rectangles lit at their corners
//!
//! Both read a [`NeighborhoodSnapshot`], which carries one voxel of border around the
//! chunk, so faces on the chunk edge are culled against the real neighbouring terrain.
//! Both write into a [`Tesselator`].

pub mod face;
pub mod greedy;
pub mod naive;
pub mod tesselator;

use serde::{Deserialize, Serialize};

use crate::engine_state::voxels::snapshot::NeighborhoodSnapshot;

pub use tesselator::{Quad, Tesselator};

/// Which mesher the workers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshingMode {
    #[default]
    Naive,
    Greedy,
}

/// Mesher selection and shading switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshingOptions {
    pub mode: MeshingMode,
    pub ambient_occlusion: bool,
}

impl Default for MeshingOptions {
    fn default() -> Self {
        MeshingOptions {
            mode: MeshingMode::Naive,
            ambient_occlusion: true,
        }
    }
}

/// Meshes the interior of `snapshot` with the configured mesher.
///
/// # Arguments
/// * `snapshot` - A chunk's voxels plus one voxel of border
/// * `options` - Mesher and shading selection
///
/// # Returns
/// The chunk's geometry, in world coordinates.
pub fn build_chunk_mesh(snapshot: &NeighborhoodSnapshot, options: MeshingOptions) -> Tesselator {
    match options.mode {
        MeshingMode::Naive => naive::naive(snapshot, options.ambient_occlusion),
        MeshingMode::Greedy => greedy::greedy(snapshot, options.ambient_occlusion),
    }
}
