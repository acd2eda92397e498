//! # Block Module
//!
//! A voxel in this world carries nothing but a color. This module defines that
//! color value, the reserved "air" sentinel, and the shading helpers the meshers use.

pub mod block_side;

/// The underlying integer type used to store a block color in memory (`0x00RRGGBB`).
pub type BlockColorSize = u32;

/// Represents a single voxel in the world.
///
/// A block is either air or an opaque RGB color. Air is encoded with a reserved
/// sentinel value that no RGB color can take, so a single `set` call can both carve
/// (`Block::AIR`) and place (any other block).
///
/// # Memory Layout
/// The `#[repr(transparent)]` attribute keeps a `Block` layout-identical to its `u32`,
/// so column runs can be copied around as plain integers.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Block {
    /// Packed `0x00RRGGBB` color, or the air sentinel.
    pub color: BlockColorSize,
}

impl Block {
    /// The reserved "no voxel here" value.
    pub const AIR: Block = Block { color: 0xFFFF_FFFF };

    /// Color used for the indestructible ground layer of generated maps.
    pub const GROUND: Block = Block { color: 0x0028_3C50 };

    /// Creates a block from its RGB components.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Block {
            color: ((red as u32) << 16) | ((green as u32) << 8) | blue as u32,
        }
    }

    /// Creates a block from a packed `0xRRGGBB` value. The top byte is discarded so the
    /// result can never collide with the air sentinel.
    pub const fn from_packed(color: u32) -> Self {
        Block {
            color: color & 0x00FF_FFFF,
        }
    }

    /// Whether this is the air sentinel.
    pub const fn is_air(self) -> bool {
        self.color == Self::AIR.color
    }

    /// Whether this block is an opaque voxel.
    pub const fn is_solid(self) -> bool {
        !self.is_air()
    }

    /// Red component.
    pub const fn red(self) -> u8 {
        (self.color >> 16) as u8
    }

    /// Green component.
    pub const fn green(self) -> u8 {
        (self.color >> 8) as u8
    }

    /// Blue component.
    pub const fn blue(self) -> u8 {
        self.color as u8
    }

    /// Returns the color with every component scaled by `factor` (clamped to `0.0..=1.0`).
    pub fn shaded(self, factor: f32) -> Block {
        let factor = factor.clamp(0.0, 1.0);
        let scale = |component: u8| (component as f32 * factor).round() as u8;
        Block::rgb(scale(self.red()), scale(self.green()), scale(self.blue()))
    }

    /// Linear blend towards `other`; `t = 0` keeps `self`, `t = 1` yields `other`.
    pub fn mix(self, other: Block, t: f32) -> Block {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Block::rgb(
            lerp(self.red(), other.red()),
            lerp(self.green(), other.green()),
            lerp(self.blue(), other.blue()),
        )
    }

    /// The color as an `[r, g, b, a]` byte quadruple for vertex color buffers.
    pub fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.red(), self.green(), self.blue(), alpha]
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::AIR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_sentinel_is_not_a_color() {
        assert!(Block::AIR.is_air());
        assert!(Block::from_packed(0xFFFF_FFFF).is_solid());
        assert!(Block::rgb(255, 255, 255).is_solid());
    }

    #[test]
    fn components_round_trip_through_packing() {
        let block = Block::rgb(12, 34, 56);
        assert_eq!((block.red(), block.green(), block.blue()), (12, 34, 56));
        assert_eq!(block.to_rgba(200), [12, 34, 56, 200]);
    }

    #[test]
    fn shading_scales_every_component() {
        let block = Block::rgb(200, 100, 50).shaded(0.5);
        assert_eq!(block, Block::rgb(100, 50, 25));
        assert_eq!(Block::rgb(10, 10, 10).shaded(4.0), Block::rgb(10, 10, 10));
    }

    #[test]
    fn mix_blends_linearly() {
        let black = Block::rgb(0, 0, 0);
        let white = Block::rgb(255, 255, 255);
        assert_eq!(black.mix(white, 0.0), black);
        assert_eq!(black.mix(white, 1.0), white);
        assert_eq!(black.mix(white, 0.5), Block::rgb(128, 128, 128));
    }
}
