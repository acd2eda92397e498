//! Vertex data structures for handing meshes to a rendering backend.
//!
//! The tesselator keeps positions, colors and normals in separate buffers. Backends
//! that prefer a single interleaved upload can ask for `Vertex` records instead.

/// An interleaved mesh vertex.
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Color: 4x u8, RGBA (4 bytes)
/// - Normal: 4x i8, xyz plus one byte of padding (4 bytes)
///
/// Total size: 20 bytes, no implicit padding, so the struct is `Pod` and a
/// `&[Vertex]` can be uploaded with `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in world space, or relative to a structure's pivot
    pub position: [f32; 3],
    /// RGBA color with shading already applied
    pub color: [u8; 4],
    /// Outward face normal; the fourth byte is always zero
    pub normal: [i8; 4],
}

impl Vertex {
    /// Creates a new vertex.
    pub fn new(position: [f32; 3], color: [u8; 4], normal: [i8; 3]) -> Self {
        Vertex {
            position,
            color,
            normal: [normal[0], normal[1], normal[2], 0],
        }
    }
}
