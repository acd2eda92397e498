//! Greedy meshing.
//!
//! This module merges adjacent coplanar faces of the same voxel color into larger
//! quads, reducing the number of vertices handed to the rendering backend. Each of the
//! six sides is swept slice by slice; inside a slice, a rectangle grows first along the
//! side's `u` axis and then along its `w` axis, but only while the whole `u` span keeps
//! matching. Covered cells are marked in a visited set so that each exposed face is
//! emitted exactly once.
//!
//! Lighting does not block a merge. A merged face samples ambient occlusion and
//! sunlight at its four corner voxels and the rasterizer interpolates between them.

use bitvec::prelude::*;
use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, Block},
    snapshot::NeighborhoodSnapshot,
};

use super::{
    face::Face,
    naive::{face_light, is_exposed},
    tesselator::Tesselator,
};

/// Builds the visibility mask of one slice.
///
/// # Arguments
/// * `snapshot` - The neighbourhood being meshed
/// * `side` - The side being swept
/// * `layer` - The slice coordinate along the side's axis
/// * `dims` - Interior extent along x, y and z
///
/// # Returns
/// One entry per `(u, w)` cell, `u` varying fastest, holding the voxel where a face is
/// exposed.
fn slice_mask(snapshot: &NeighborhoodSnapshot, side: BlockSide, layer: i32, dims: [i32; 3]) -> Vec<Option<Block>> {
    let (u, w) = side.plane_axes();
    let mut mask = Vec::with_capacity((dims[u] * dims[w]) as usize);

    for b in 0..dims[w] {
        for a in 0..dims[u] {
            let mut coords = [0; 3];
            coords[side.axis()] = layer;
            coords[u] = a;
            coords[w] = b;
            let position = Point3::new(coords[0], coords[1], coords[2]);

            let block = snapshot.get(position.x, position.y, position.z);
            let exposed = !block.is_air() && is_exposed(snapshot, position, side);
            mask.push(exposed.then_some(block));
        }
    }

    mask
}

/// Merges one slice mask into rectangles and emits them.
fn merge_slice(
    snapshot: &NeighborhoodSnapshot,
    mask: &[Option<Block>],
    (side, layer): (BlockSide, i32),
    dims: [i32; 3],
    ambient_occlusion: bool,
    tesselator: &mut Tesselator,
) {
    let (u, w) = side.plane_axes();
    let (extent_u, extent_w) = (dims[u], dims[w]);
    let index = |a: i32, b: i32| (b * extent_u + a) as usize;
    let offset = Vector3::new(snapshot.origin_x() as f32, 0.0, snapshot.origin_z() as f32);
    let mut visited = bitvec![0; mask.len()];

    for b in 0..extent_w {
        for a in 0..extent_u {
            if visited[index(a, b)] {
                continue;
            }
            let Some(block) = mask[index(a, b)] else {
                continue;
            };
            let matches = |i: usize, visited: &BitVec| !visited[i] && mask[i] == Some(block);

            let mut width = 1;
            while a + width < extent_u && matches(index(a + width, b), &visited) {
                width += 1;
            }
            let mut height = 1;
            'grow: while b + height < extent_w {
                for k in 0..width {
                    if !matches(index(a + k, b + height), &visited) {
                        break 'grow;
                    }
                }
                height += 1;
            }

            for row in b..b + height {
                for column in a..a + width {
                    visited.set(index(column, row), true);
                }
            }

            let mut origin = [0; 3];
            origin[side.axis()] = layer;
            origin[u] = a;
            origin[w] = b;
            let mut face = Face::merged(
                Point3::new(origin[0], origin[1], origin[2]),
                side,
                block.shaded(side.shade()),
                width,
                height,
            );
            face.light = face_light(snapshot, &face, ambient_occlusion);
            face.emit(tesselator, offset);
        }
    }
}

/// Meshes the interior of `snapshot`, merging coplanar faces of equal color.
///
/// Covers exactly the faces `naive` would emit, with at most as many quads.
/// Vertex positions are in world space.
pub fn greedy(snapshot: &NeighborhoodSnapshot, ambient_occlusion: bool) -> Tesselator {
    let mut tesselator = Tesselator::new();
    let size = snapshot.size() as i32;
    let dims = [size, snapshot.height() as i32, size];

    for side in BlockSide::all() {
        for layer in 0..dims[side.axis()] {
            let mask = slice_mask(snapshot, side, layer, dims);
            merge_slice(snapshot, &mask, (side, layer), dims, ambient_occlusion, &mut tesselator);
        }
    }

    tesselator
}

#[cfg(test)]
mod tests {
    use super::super::naive::naive;
    use super::*;

    fn covered_area(mesh: &Tesselator, side: BlockSide) -> f32 {
        mesh.quads()
            .filter(|quad| quad.side() == Some(side))
            .map(|quad| {
                let (min, max) = quad.bounds();
                let extent = max - min;
                let (u, w) = side.plane_axes();
                extent[u] * extent[w]
            })
            .sum()
    }

    fn slab(color: Block) -> NeighborhoodSnapshot {
        let mut snapshot = NeighborhoodSnapshot::filled(0, 0, 4, 6, Block::AIR);
        for x in 0..4 {
            for z in 0..4 {
                snapshot.column_mut(x, z)[2] = color;
            }
        }
        snapshot
    }

    #[test]
    fn uniform_slab_top_collapses_to_one_quad() {
        let snapshot = slab(Block::rgb(90, 120, 60));
        let mesh = greedy(&snapshot, false);

        let tops: Vec<_> = mesh
            .quads()
            .filter(|quad| quad.side() == Some(BlockSide::TOP))
            .collect();
        assert_eq!(tops.len(), 1);
        assert_eq!(
            tops[0].bounds(),
            (Point3::new(0.0, 3.0, 0.0), Point3::new(4.0, 3.0, 4.0))
        );
    }

    #[test]
    fn greedy_covers_the_same_faces_as_naive_with_fewer_quads() {
        let mut snapshot = slab(Block::rgb(90, 120, 60));
        // A second color and a bump break up some runs.
        snapshot.column_mut(1, 1)[2] = Block::rgb(10, 10, 10);
        snapshot.column_mut(2, 2)[3] = Block::rgb(90, 120, 60);

        for ambient_occlusion in [false, true] {
            let naive_mesh = naive(&snapshot, ambient_occlusion);
            let greedy_mesh = greedy(&snapshot, ambient_occlusion);

            assert!(greedy_mesh.quad_count() < naive_mesh.quad_count());
            for side in BlockSide::all() {
                assert_eq!(
                    covered_area(&greedy_mesh, side),
                    covered_area(&naive_mesh, side),
                    "{:?}",
                    side
                );
            }
        }
    }

    #[test]
    fn different_colors_are_not_merged() {
        let mut snapshot = NeighborhoodSnapshot::filled(0, 0, 4, 4, Block::AIR);
        snapshot.column_mut(0, 0)[1] = Block::rgb(200, 0, 0);
        snapshot.column_mut(1, 0)[1] = Block::rgb(0, 200, 0);

        let mesh = greedy(&snapshot, false);
        assert_eq!(mesh.quad_count(), naive(&snapshot, false).quad_count());
        assert_eq!(
            mesh.quads()
                .filter(|quad| quad.side() == Some(BlockSide::TOP))
                .count(),
            2
        );
    }

    #[test]
    fn uneven_occlusion_still_merges() {
        // Two floor voxels along x, a wall voxel standing beside the first one.
        let mut snapshot = NeighborhoodSnapshot::filled(0, 0, 3, 4, Block::AIR);
        let stone = Block::rgb(100, 100, 100);
        snapshot.column_mut(0, 0)[0] = stone;
        snapshot.column_mut(1, 0)[0] = stone;
        snapshot.column_mut(0, 1)[1] = stone;

        let mesh = greedy(&snapshot, true);
        let floor_tops: Vec<_> = mesh
            .quads()
            .filter(|quad| quad.side() == Some(BlockSide::TOP) && quad.bounds().0.y == 1.0)
            .collect();
        assert_eq!(floor_tops.len(), 1);
        assert_eq!(
            floor_tops[0].bounds(),
            (Point3::new(0.0, 1.0, 0.0), Point3::new(2.0, 1.0, 1.0))
        );
        // TOP: u = Z, w = X. Corner 1 sits at (x 0, z 1), next to the wall.
        let colors = floor_tops[0].colors;
        assert_eq!(colors[0], colors[2]);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn scattered_cells_with_occlusion_need_fewer_quads() {
        let mut snapshot = NeighborhoodSnapshot::filled(0, 0, 3, 3, Block::AIR);
        for (x, y, z) in [(0, 0, 0), (0, 2, 1), (1, 2, 0), (1, 0, 1), (2, 0, 1), (2, 1, 2)] {
            snapshot.column_mut(x, z)[y as usize] = Block::rgb(140, 110, 70);
        }

        for ambient_occlusion in [false, true] {
            let naive_quads = naive(&snapshot, ambient_occlusion).quad_count();
            let greedy_quads = greedy(&snapshot, ambient_occlusion).quad_count();
            assert!(greedy_quads < naive_quads, "{} vs {}", greedy_quads, naive_quads);
        }
    }

    #[test]
    fn offset_places_quads_in_world_space() {
        let mut snapshot = NeighborhoodSnapshot::filled(64, 128, 2, 2, Block::AIR);
        snapshot.column_mut(0, 0)[0] = Block::rgb(1, 2, 3);

        let mesh = greedy(&snapshot, false);
        for quad in mesh.quads() {
            let (min, max) = quad.bounds();
            assert!(min.x >= 64.0 && max.x <= 65.0);
            assert!(min.z >= 128.0 && max.z <= 129.0);
        }
    }
}
