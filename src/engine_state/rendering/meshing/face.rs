use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::{block_side::BlockSide, Block};

use super::tesselator::Tesselator;

/// Corner order shared by every face: `(u, w)` steps in units of the face extent.
const CORNER_STEPS: [(i32, i32); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// A rectangular, axis-aligned face covering one or more voxels of a single slice.
///
/// `origin` is the voxel whose face forms the `(0, 0)` corner of the rectangle;
/// the rectangle extends `width` voxels along the side's `u` axis and `height` voxels
/// along its `w` axis (see `BlockSide::plane_axes`). The naive mesher emits 1×1 faces,
/// the greedy mesher merged ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Which side of the voxels this face represents
    pub side: BlockSide,
    /// Voxel at the `(0, 0)` corner
    pub origin: Point3<i32>,
    /// Extent along the `u` axis, in voxels
    pub width: i32,
    /// Extent along the `w` axis, in voxels
    pub height: i32,
    /// Face color with the side's brightness applied
    pub color: Block,
    /// Per-corner brightness (ambient occlusion and sunlight), in corner order
    pub light: [f32; 4],
}

impl Face {
    /// A single-voxel face with full brightness at every corner.
    pub fn new(origin: Point3<i32>, side: BlockSide, color: Block) -> Self {
        Face {
            side,
            origin,
            width: 1,
            height: 1,
            color,
            light: [1.0; 4],
        }
    }

    /// A `width × height` merged face.
    pub fn merged(origin: Point3<i32>, side: BlockSide, color: Block, width: i32, height: i32) -> Self {
        Face {
            width,
            height,
            ..Face::new(origin, side, color)
        }
    }

    /// Integer corner positions, counter-clockwise seen from outside.
    pub fn corners(&self) -> [Point3<i32>; 4] {
        let axis = self.side.axis();
        let (u, w) = self.side.plane_axes();
        let origin = [self.origin.x, self.origin.y, self.origin.z];

        CORNER_STEPS.map(|(su, sw)| {
            let mut corner = origin;
            if self.side.is_positive() {
                corner[axis] += 1;
            }
            corner[u] += su * self.width;
            corner[w] += sw * self.height;
            Point3::new(corner[0], corner[1], corner[2])
        })
    }

    /// The voxel each corner belongs to. For a single-voxel face that is `origin`
    /// four times; a merged face reaches its far voxels along `u` and `w`.
    pub fn corner_voxels(&self) -> [Point3<i32>; 4] {
        let (u, w) = self.side.plane_axes();
        let origin = [self.origin.x, self.origin.y, self.origin.z];

        CORNER_STEPS.map(|(su, sw)| {
            let mut voxel = origin;
            voxel[u] += su * (self.width - 1);
            voxel[w] += sw * (self.height - 1);
            Point3::new(voxel[0], voxel[1], voxel[2])
        })
    }

    /// For each corner, the `(u, w)` direction pointing away from the face's interior.
    /// Ambient occlusion samples the voxels in these directions.
    pub fn corner_directions() -> [(i32, i32); 4] {
        CORNER_STEPS.map(|(su, sw)| (su * 2 - 1, sw * 2 - 1))
    }

    /// Writes this face into `tesselator`, translated by `offset`.
    pub fn emit(&self, tesselator: &mut Tesselator, offset: Vector3<f32>) {
        let corners = self.corners().map(|corner| {
            Point3::new(
                corner.x as f32 + offset.x,
                corner.y as f32 + offset.y,
                corner.z as f32 + offset.z,
            )
        });
        let colors = self.light.map(|light| self.color.shaded(light).to_rgba(255));
        tesselator.add_quad(corners, colors, self.side.normal());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_faces_sit_on_the_far_plane() {
        let face = Face::new(Point3::new(2, 3, 4), BlockSide::TOP, Block::rgb(1, 1, 1));
        for corner in face.corners() {
            assert_eq!(corner.y, 4);
        }
        let face = Face::new(Point3::new(2, 3, 4), BlockSide::BOTTOM, Block::rgb(1, 1, 1));
        for corner in face.corners() {
            assert_eq!(corner.y, 3);
        }
    }

    #[test]
    fn merged_face_spans_its_extent() {
        let face = Face::merged(Point3::new(0, 0, 0), BlockSide::FRONT, Block::rgb(1, 1, 1), 3, 2);
        // FRONT: u = X, w = Y, plane at z = 1.
        assert_eq!(
            face.corners(),
            [
                Point3::new(0, 0, 1),
                Point3::new(3, 0, 1),
                Point3::new(3, 2, 1),
                Point3::new(0, 2, 1)
            ]
        );
    }

    #[test]
    fn corner_voxels_reach_the_far_edges() {
        let single = Face::new(Point3::new(4, 1, 2), BlockSide::TOP, Block::rgb(1, 1, 1));
        assert_eq!(single.corner_voxels(), [Point3::new(4, 1, 2); 4]);

        // TOP: u = Z, w = X.
        let merged = Face::merged(Point3::new(4, 1, 2), BlockSide::TOP, Block::rgb(1, 1, 1), 3, 2);
        assert_eq!(
            merged.corner_voxels(),
            [
                Point3::new(4, 1, 2),
                Point3::new(4, 1, 4),
                Point3::new(5, 1, 4),
                Point3::new(5, 1, 2)
            ]
        );
    }

    #[test]
    fn emit_applies_offset_and_light() {
        let mut face = Face::new(Point3::new(0, 0, 0), BlockSide::RIGHT, Block::rgb(200, 200, 200));
        face.light = [1.0, 0.5, 0.5, 0.25];

        let mut tesselator = Tesselator::new();
        face.emit(&mut tesselator, Vector3::new(10.0, 0.0, 0.0));

        let quad = tesselator.quads().next().unwrap();
        assert_eq!(quad.corners[0], Point3::new(11.0, 0.0, 0.0));
        assert_eq!(quad.colors[0], [200, 200, 200, 255]);
        assert_eq!(quad.colors[3], [50, 50, 50, 255]);
        assert_eq!(quad.side(), Some(BlockSide::RIGHT));
    }
}
