//! Per-voxel face culling with ambient occlusion.
//!
//! Every solid voxel is tested against its six neighbours and one quad is emitted for
//! each side that faces air. Each quad is shaded by its side's fixed brightness, by
//! the sunlight scan on top faces, and optionally by per-corner ambient occlusion.

use std::collections::HashMap;

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, Block},
    snapshot::NeighborhoodSnapshot,
};

use super::{face::Face, tesselator::Tesselator};

/// Brightness budget of the sunlight scan; a fully lit voxel scores this.
const SUNLIGHT_FULL: i32 = 127;
/// Darkening contributed by an occupied cell directly above, decreasing by
/// `SUNLIGHT_FALLOFF` for each further step.
const SUNLIGHT_FIRST_STEP: i32 = 18;
const SUNLIGHT_FALLOFF: i32 = 2;

/// Ambient-occlusion factor of one face corner, from the two edge neighbours and the
/// diagonal neighbour in front of the face. Ranges from `0.25` to `1.0`.
pub fn vertex_ambient_occlusion(side1: bool, side2: bool, corner: bool) -> f32 {
    if side1 && side2 {
        return 0.25;
    }
    1.0 - 0.25 * (side1 as u8 + side2 as u8 + corner as u8) as f32
}

/// Per-corner ambient-occlusion factors of a face, each sampled around the voxel
/// that owns the corner.
pub fn corner_light(snapshot: &NeighborhoodSnapshot, face: &Face) -> [f32; 4] {
    let (u, w) = face.side.plane_axes();
    let normal = face.side.normal();
    let solid = |cell: [i32; 3]| snapshot.is_solid(cell[0], cell[1], cell[2]);
    let voxels = face.corner_voxels();
    let directions = Face::corner_directions();

    std::array::from_fn(|corner| {
        let voxel = voxels[corner];
        let (du, dw) = directions[corner];
        let front = [voxel.x + normal.x, voxel.y + normal.y, voxel.z + normal.z];
        let mut side1 = front;
        side1[u] += du;
        let mut side2 = front;
        side2[w] += dw;
        let mut diagonal = side1;
        diagonal[w] += dw;
        vertex_ambient_occlusion(solid(side1), solid(side2), solid(diagonal))
    })
}

/// Per-corner brightness of a face: ambient occlusion when enabled, times sunlight
/// on top faces. Both are read at each corner's own voxel.
pub fn face_light(snapshot: &NeighborhoodSnapshot, face: &Face, ambient_occlusion: bool) -> [f32; 4] {
    let mut light = if ambient_occlusion {
        corner_light(snapshot, face)
    } else {
        [1.0; 4]
    };
    if face.side == BlockSide::TOP {
        for (light, voxel) in light.iter_mut().zip(face.corner_voxels()) {
            *light *= sunlight(snapshot, voxel.x, voxel.y, voxel.z);
        }
    }
    light
}

/// Fraction of sunlight reaching the top of voxel `(x, y, z)`.
///
/// Scans the column upwards in fixed steps; every occupied cell darkens the result,
/// cells further away less so. Returns `1.0` for an unobstructed sky.
pub fn sunlight(snapshot: &NeighborhoodSnapshot, x: i32, y: i32, z: i32) -> f32 {
    let mut light = SUNLIGHT_FULL;
    let mut contribution = SUNLIGHT_FIRST_STEP;
    let mut current = y;
    let top = snapshot.height() as i32 - 1;

    while contribution > 0 && current < top {
        current += 1;
        if snapshot.is_solid(x, current, z) {
            light -= contribution;
        }
        contribution -= SUNLIGHT_FALLOFF;
    }

    light as f32 / SUNLIGHT_FULL as f32
}

/// Whether the given side of the voxel at `position` faces air.
pub fn is_exposed(snapshot: &NeighborhoodSnapshot, position: Point3<i32>, side: BlockSide) -> bool {
    let normal = side.normal();
    !snapshot.is_solid(
        position.x + normal.x,
        position.y + normal.y,
        position.z + normal.z,
    )
}

/// Meshes the interior of `snapshot` one quad per exposed voxel face.
///
/// Vertex positions are in world space.
pub fn naive(snapshot: &NeighborhoodSnapshot, ambient_occlusion: bool) -> Tesselator {
    let mut tesselator = Tesselator::new();
    let offset = Vector3::new(snapshot.origin_x() as f32, 0.0, snapshot.origin_z() as f32);
    let size = snapshot.size() as i32;
    let height = snapshot.height() as i32;

    for z in 0..size {
        for x in 0..size {
            for y in 0..height {
                let block = snapshot.get(x, y, z);
                if block.is_air() {
                    continue;
                }
                let position = Point3::new(x, y, z);

                for side in BlockSide::all() {
                    if !is_exposed(snapshot, position, side) {
                        continue;
                    }
                    let mut face = Face::new(position, side, block.shaded(side.shade()));
                    face.light = face_light(snapshot, &face, ambient_occlusion);
                    face.emit(&mut tesselator, offset);
                }
            }
        }
    }

    tesselator
}

/// Meshes a free-standing voxel set, such as a detached structure.
///
/// A face is exposed when the neighbouring coordinate is not part of the set; nothing
/// outside the set is consulted. Vertices are relative to `pivot`.
pub fn mesh_voxel_set(voxels: &HashMap<Point3<i32>, Block>, pivot: Point3<f32>) -> Tesselator {
    let mut tesselator = Tesselator::with_capacity(voxels.len() * 2);
    let offset = Vector3::new(-pivot.x, -pivot.y, -pivot.z);

    for (position, block) in voxels {
        for side in BlockSide::all() {
            let neighbour = *position + side.normal();
            if voxels.contains_key(&neighbour) {
                continue;
            }
            Face::new(*position, side, block.shaded(side.shade())).emit(&mut tesselator, offset);
        }
    }

    tesselator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(voxels: &[(i32, i32, i32)]) -> NeighborhoodSnapshot {
        let mut snapshot = NeighborhoodSnapshot::filled(0, 0, 4, 8, Block::AIR);
        for &(x, y, z) in voxels {
            snapshot.column_mut(x, z)[y as usize] = Block::rgb(100, 100, 100);
        }
        snapshot
    }

    #[test]
    fn floating_voxel_emits_six_faces() {
        let snapshot = snapshot_with(&[(1, 3, 1)]);
        let mesh = naive(&snapshot, false);
        assert_eq!(mesh.quad_count(), 6);
    }

    #[test]
    fn bottom_layer_never_shows_its_underside() {
        let snapshot = snapshot_with(&[(1, 0, 1)]);
        let mesh = naive(&snapshot, false);
        assert_eq!(mesh.quad_count(), 5);
        assert!(mesh.quads().all(|quad| quad.side() != Some(BlockSide::BOTTOM)));
    }

    #[test]
    fn top_layer_is_always_exposed() {
        let snapshot = snapshot_with(&[(1, 7, 1)]);
        let mesh = naive(&snapshot, false);
        assert!(mesh.quads().any(|quad| quad.side() == Some(BlockSide::TOP)));
    }

    #[test]
    fn adjacent_voxels_hide_their_shared_faces() {
        let snapshot = snapshot_with(&[(1, 3, 1), (2, 3, 1)]);
        assert_eq!(naive(&snapshot, false).quad_count(), 10);
    }

    #[test]
    fn ambient_occlusion_table() {
        assert_eq!(vertex_ambient_occlusion(false, false, false), 1.0);
        assert_eq!(vertex_ambient_occlusion(false, false, true), 0.75);
        assert_eq!(vertex_ambient_occlusion(true, false, true), 0.5);
        assert_eq!(vertex_ambient_occlusion(true, true, false), 0.25);
        assert_eq!(vertex_ambient_occlusion(true, true, true), 0.25);
    }

    #[test]
    fn corner_next_to_a_wall_is_darkened() {
        // Floor voxel with a wall voxel standing on its +x neighbour.
        let snapshot = snapshot_with(&[(1, 2, 1), (2, 3, 1)]);
        let face = Face::new(Point3::new(1, 2, 1), BlockSide::TOP, Block::rgb(1, 1, 1));
        let light = corner_light(&snapshot, &face);

        // TOP: u = Z, w = X. Corners 2 and 3 are on the +x edge.
        assert_eq!(light[0], 1.0);
        assert_eq!(light[1], 1.0);
        assert_eq!(light[2], 0.75);
        assert_eq!(light[3], 0.75);
    }

    #[test]
    fn top_face_light_folds_in_sunlight() {
        let snapshot = snapshot_with(&[(1, 1, 1), (1, 3, 1)]);
        let face = Face::new(Point3::new(1, 1, 1), BlockSide::TOP, Block::rgb(1, 1, 1));
        let shaded = sunlight(&snapshot, 1, 1, 1);
        assert_eq!(face_light(&snapshot, &face, false), [shaded; 4]);

        let side = Face::new(Point3::new(1, 1, 1), BlockSide::FRONT, Block::rgb(1, 1, 1));
        assert_eq!(face_light(&snapshot, &side, false), [1.0; 4]);
    }

    #[test]
    fn sunlight_darkens_under_overhangs() {
        let open = snapshot_with(&[(1, 1, 1)]);
        assert_eq!(sunlight(&open, 1, 1, 1), 1.0);

        let covered = snapshot_with(&[(1, 1, 1), (1, 3, 1)]);
        let expected = (127 - 16) as f32 / 127.0;
        assert_eq!(sunlight(&covered, 1, 1, 1), expected);
    }

    #[test]
    fn voxel_set_mesh_hides_internal_faces() {
        let mut voxels = HashMap::new();
        voxels.insert(Point3::new(0, 0, 0), Block::rgb(10, 10, 10));
        voxels.insert(Point3::new(1, 0, 0), Block::rgb(10, 10, 10));

        let mesh = mesh_voxel_set(&voxels, Point3::new(1.0, 0.5, 0.5));
        assert_eq!(mesh.quad_count(), 10);
        let (min, max) = mesh
            .quads()
            .map(|quad| quad.bounds())
            .fold((Point3::new(f32::MAX, f32::MAX, f32::MAX), Point3::new(f32::MIN, f32::MIN, f32::MIN)), |(lo, hi), (a, b)| {
                (
                    Point3::new(lo.x.min(a.x), lo.y.min(a.y), lo.z.min(a.z)),
                    Point3::new(hi.x.max(b.x), hi.y.max(b.y), hi.z.max(b.z)),
                )
            });
        assert_eq!(min, Point3::new(-1.0, -0.5, -0.5));
        assert_eq!(max, Point3::new(1.0, 0.5, 0.5));
    }
}
