//! Demo terrain.
//!
//! Fills a world from a 2D Perlin height field: an indestructible ground layer at the
//! bottom, soil up to the surface and a grass cap whose tint follows the height.

use noise::{NoiseFn, Perlin};

use super::{block::Block, world::World};

/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.015;
/// Height of the indestructible ground layer, inclusive.
pub const GROUND_LAYERS: i32 = 1;

const SOIL: Block = Block::rgb(112, 84, 52);
const GRASS: Block = Block::rgb(72, 140, 54);
const SNOW: Block = Block::rgb(230, 232, 236);

/// Surface height of column `(x, z)` for a world `size_y` voxels tall.
pub fn surface_height(perlin: &Perlin, x: i32, z: i32, size_y: usize) -> i32 {
    let sample = perlin.get([x as f64 * PERLIN_SCALE_FACTOR, z as f64 * PERLIN_SCALE_FACTOR]);
    let base = size_y as f64 * 0.35;
    let amplitude = size_y as f64 * 0.25;
    let height = (base + sample * amplitude).round() as i32;
    height.clamp(GROUND_LAYERS + 1, size_y as i32 - 1)
}

/// Fills `world` with Perlin terrain.
///
/// # Returns
/// The number of solid voxels written.
pub fn generate_terrain(world: &World, seed: u32) -> usize {
    let perlin = Perlin::new(seed);
    let size_y = world.size_y();
    let snow_line = (size_y as f32 * 0.55) as i32;
    let mut written = 0;

    for z in 0..world.size_z() as i32 {
        for x in 0..world.size_x() as i32 {
            let top = surface_height(&perlin, x, z, size_y);
            for y in 0..=top {
                let block = if y <= GROUND_LAYERS {
                    Block::GROUND
                } else if y < top {
                    SOIL
                } else if y >= snow_line {
                    SNOW
                } else {
                    GRASS.shaded(0.8 + 0.2 * y as f32 / snow_line as f32)
                };
                world.set(x, y, z, block);
                written += 1;
            }
        }
    }

    written
}
