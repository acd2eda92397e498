//! Top-down minimap.
//!
//! Mesh workers produce one strip per chunk: the color of the topmost solid voxel of
//! every column, with the chunk-boundary grid line blended in. The main thread copies
//! adopted strips into a single stitched [`Minimap`] covering the whole map, which a
//! consumer can read as pixels or export as a PNG.

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::engine_state::voxels::{block::Block, snapshot::NeighborhoodSnapshot};
use crate::engine_state::EngineError;

/// Color of a column with no solid voxel.
pub const EMPTY_COLUMN: Block = Block::rgb(0, 0, 0);
/// Color blended into the first row and column of every chunk.
pub const GRID_LINE: Block = Block::rgb(255, 255, 255);
/// How strongly the grid line shows through.
pub const GRID_LINE_WEIGHT: f32 = 0.35;

/// Builds one chunk's minimap strip from its snapshot.
///
/// # Returns
/// `size × size` colors, row-major with `x` varying fastest.
pub fn build_strip(snapshot: &NeighborhoodSnapshot) -> Vec<Block> {
    let size = snapshot.size() as i32;
    let mut strip = Vec::with_capacity((size * size) as usize);

    for z in 0..size {
        for x in 0..size {
            let color = snapshot
                .top_solid(x, z)
                .map(|y| snapshot.get(x, y, z))
                .unwrap_or(EMPTY_COLUMN);
            if x == 0 || z == 0 {
                strip.push(color.mix(GRID_LINE, GRID_LINE_WEIGHT));
            } else {
                strip.push(color);
            }
        }
    }

    strip
}

/// The stitched map-wide minimap.
#[derive(Debug, Clone)]
pub struct Minimap {
    width: usize,
    height: usize,
    pixels: Vec<Block>,
}

impl Minimap {
    /// Creates an all-empty minimap of `width × height` columns.
    pub fn new(width: usize, height: usize) -> Self {
        Minimap {
            width,
            height,
            pixels: vec![EMPTY_COLUMN; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixels, `x` varying fastest.
    pub fn pixels(&self) -> &[Block] {
        &self.pixels
    }

    /// Color of column `(x, z)`, or `None` outside the map.
    pub fn pixel(&self, x: usize, z: usize) -> Option<Block> {
        (x < self.width && z < self.height).then(|| self.pixels[z * self.width + x])
    }

    /// Copies a chunk strip into place. Parts falling outside the map are dropped.
    ///
    /// # Arguments
    /// * `origin_x`, `origin_z` - World column of the strip's first pixel
    /// * `size` - Edge length of the strip
    /// * `strip` - Colors as produced by [`build_strip`]
    pub fn update_strip(&mut self, origin_x: usize, origin_z: usize, size: usize, strip: &[Block]) {
        for (row, line) in strip.chunks(size).enumerate() {
            let z = origin_z + row;
            if z >= self.height {
                break;
            }
            for (column, color) in line.iter().enumerate() {
                let x = origin_x + column;
                if x >= self.width {
                    break;
                }
                self.pixels[z * self.width + x] = *color;
            }
        }
    }

    /// Resets every pixel to the empty color.
    pub fn clear(&mut self) {
        self.pixels.fill(EMPTY_COLUMN);
    }

    /// Renders the minimap into an RGBA image.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, z| {
            Rgba(self.pixels[z as usize * self.width + x as usize].to_rgba(255))
        })
    }

    /// Writes the minimap to `path` as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.to_image().save(path)?;
        Ok(())
    }
}
