//! # Block Side Module
//!
//! This module defines the six faces of a voxel and the per-face constants the
//! meshers rely on: outward normal, sweep axis, in-plane axes and brightness.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a unique integer value so it can index per-side arrays.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// The outward unit normal of this face, in world axes (Y is up).
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// Index (0 = X, 1 = Y, 2 = Z) of the axis this face is perpendicular to.
    pub fn axis(self) -> usize {
        match self {
            BlockSide::LEFT | BlockSide::RIGHT => 0,
            BlockSide::BOTTOM | BlockSide::TOP => 1,
            BlockSide::FRONT | BlockSide::BACK => 2,
        }
    }

    /// Whether the normal points along the positive direction of its axis.
    pub fn is_positive(self) -> bool {
        matches!(self, BlockSide::FRONT | BlockSide::TOP | BlockSide::RIGHT)
    }

    /// The two in-plane axes `(u, w)` of this face.
    ///
    /// They are ordered so that `u × w` equals the outward normal, which makes the
    /// corner order `(0,0) (1,0) (1,1) (0,1)` counter-clockwise seen from outside.
    pub fn plane_axes(self) -> (usize, usize) {
        match self {
            BlockSide::RIGHT => (1, 2),
            BlockSide::LEFT => (2, 1),
            BlockSide::TOP => (2, 0),
            BlockSide::BOTTOM => (0, 2),
            BlockSide::FRONT => (0, 1),
            BlockSide::BACK => (1, 0),
        }
    }

    /// Fixed per-direction brightness multiplier applied to every face on this side.
    pub fn shade(self) -> f32 {
        match self {
            BlockSide::TOP => 1.0,
            BlockSide::BOTTOM => 0.5,
            BlockSide::LEFT | BlockSide::RIGHT => 0.875,
            BlockSide::FRONT | BlockSide::BACK => 0.75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    fn unit(axis: usize) -> Vector3<i32> {
        let mut v = Vector3::new(0, 0, 0);
        v[axis] = 1;
        v
    }

    #[test]
    fn plane_axes_are_right_handed_around_the_normal() {
        for side in BlockSide::all() {
            let (u, w) = side.plane_axes();
            assert_eq!(unit(u).cross(unit(w)), side.normal(), "{side:?}");
        }
    }

    #[test]
    fn normal_matches_axis_and_sign() {
        for side in BlockSide::all() {
            let normal = side.normal();
            let expected = if side.is_positive() { 1 } else { -1 };
            assert_eq!(normal[side.axis()], expected, "{side:?}");
        }
    }
}
