//! Damage overlay geometry.
//!
//! Damaged voxels are drawn as slightly inflated translucent black cubes. The alpha of
//! every face is proportional to the voxel's accumulated damage, so cracks darken as a
//! voxel approaches destruction.

use cgmath::Point3;

use crate::engine_state::voxels::{block::block_side::BlockSide, damage::DamageMap};

use super::meshing::tesselator::Tesselator;

/// How far overlay faces sit outside the voxel surface, to avoid z-fighting.
const OVERLAY_INFLATE: f32 = 0.002;

/// Overlay alpha for a damage value in `0..=100`.
pub fn damage_alpha(damage: u8) -> u8 {
    (damage.min(100) as u32 * 255 / 100) as u8
}

/// Appends the six faces of one overlay cube.
fn add_cube(tesselator: &mut Tesselator, position: Point3<i32>, alpha: u8) {
    let min = Point3::new(
        position.x as f32 - OVERLAY_INFLATE,
        position.y as f32 - OVERLAY_INFLATE,
        position.z as f32 - OVERLAY_INFLATE,
    );
    let extent = 1.0 + 2.0 * OVERLAY_INFLATE;
    let color = [0, 0, 0, alpha];

    for side in BlockSide::all() {
        let axis = side.axis();
        let (u, w) = side.plane_axes();
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].map(|(su, sw)| {
            let mut corner = [min.x, min.y, min.z];
            if side.is_positive() {
                corner[axis] += extent;
            }
            corner[u] += su * extent;
            corner[w] += sw * extent;
            Point3::new(corner[0], corner[1], corner[2])
        });
        tesselator.add_quad(corners, [color; 4], side.normal());
    }
}

/// Builds the overlay for every voxel currently tracked by `damage`.
pub fn build_damage_overlay(damage: &DamageMap) -> Tesselator {
    let entries = damage.snapshot();
    let mut tesselator = Tesselator::with_capacity(entries.len() * 6);
    for (position, amount) in entries {
        if amount > 0 {
            add_cube(&mut tesselator, position, damage_alpha(amount));
        }
    }
    tesselator
}
