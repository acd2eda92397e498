//! Scratch geometry accumulator.
//!
//! A `Tesselator` collects axis-aligned quads as three parallel vertex buffers
//! (position, color, normal), four vertices per quad. It is what a mesh worker hands
//! back to the main thread, and what the rendering backend uploads.

use cgmath::{Point3, Vector3};

use crate::engine_state::rendering::vertex::Vertex;
use crate::engine_state::voxels::block::block_side::BlockSide;

/// Vertex buffers for a batch of quads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tesselator {
    positions: Vec<[f32; 3]>,
    colors: Vec<[u8; 4]>,
    normals: Vec<[i8; 3]>,
}

/// One quad read back out of a tesselator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quad {
    /// Corners in emission order (counter-clockwise seen from outside)
    pub corners: [Point3<f32>; 4],
    /// Per-corner RGBA
    pub colors: [[u8; 4]; 4],
    /// Outward normal
    pub normal: Vector3<i8>,
}

impl Quad {
    /// The block side whose normal this quad carries.
    pub fn side(&self) -> Option<BlockSide> {
        let normal = self.normal.cast::<i32>()?;
        BlockSide::all().into_iter().find(|side| side.normal() == normal)
    }

    /// Component-wise minimum and maximum corner.
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for corner in &self.corners[1..] {
            min = Point3::new(min.x.min(corner.x), min.y.min(corner.y), min.z.min(corner.z));
            max = Point3::new(max.x.max(corner.x), max.y.max(corner.y), max.z.max(corner.z));
        }
        (min, max)
    }
}

impl Tesselator {
    /// Creates an empty tesselator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tesselator with room for `quads` quads.
    pub fn with_capacity(quads: usize) -> Self {
        Tesselator {
            positions: Vec::with_capacity(quads * 4),
            colors: Vec::with_capacity(quads * 4),
            normals: Vec::with_capacity(quads * 4),
        }
    }

    /// Appends one quad.
    pub fn add_quad(&mut self, corners: [Point3<f32>; 4], colors: [[u8; 4]; 4], normal: Vector3<i32>) {
        let normal = [normal.x as i8, normal.y as i8, normal.z as i8];
        for (corner, color) in corners.iter().zip(colors) {
            self.positions.push([corner.x, corner.y, corner.z]);
            self.colors.push(color);
            self.normals.push(normal);
        }
    }

    /// Number of quads emitted so far.
    pub fn quad_count(&self) -> usize {
        self.positions.len() / 4
    }

    /// Number of vertices emitted so far.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The position buffer.
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// The color buffer.
    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }

    /// The normal buffer.
    pub fn normals(&self) -> &[[i8; 3]] {
        &self.normals
    }

    /// Discards all geometry, keeping the allocations.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.normals.clear();
    }

    /// Reads the quads back out, in emission order.
    pub fn quads(&self) -> impl Iterator<Item = Quad> + '_ {
        (0..self.quad_count()).map(move |quad| {
            let base = quad * 4;
            let corner = |i: usize| {
                let [x, y, z] = self.positions[base + i];
                Point3::new(x, y, z)
            };
            let [nx, ny, nz] = self.normals[base];
            Quad {
                corners: [corner(0), corner(1), corner(2), corner(3)],
                colors: [
                    self.colors[base],
                    self.colors[base + 1],
                    self.colors[base + 2],
                    self.colors[base + 3],
                ],
                normal: Vector3::new(nx, ny, nz),
            }
        })
    }

    /// The geometry as one interleaved vertex array.
    pub fn interleaved(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(&self.colors)
            .zip(&self.normals)
            .map(|((position, color), normal)| Vertex::new(*position, *color, *normal))
            .collect()
    }

    /// Index buffer turning every quad into two triangles.
    pub fn indices(&self) -> Vec<u32> {
        (0..self.quad_count() as u32)
            .flat_map(Self::generate_face_indices)
            .collect()
    }

    /// The six indices of quad number `quad`, as two counter-clockwise triangles.
    pub fn generate_face_indices(quad: u32) -> [u32; 6] {
        let base = quad * 4;
        [base, base + 1, base + 2, base, base + 2, base + 3]
    }
}
