//! Geometry handed to the rendering backend.
//!
//! The engine never talks to a GPU. It produces immutable geometry (one tesselator
//! per chunk, one per falling structure, one for the damage overlay) and a stitched
//! minimap, and the backend uploads and draws them.

pub mod meshing;
pub mod minimap;
pub mod overlay;
pub mod tasks;
pub mod vertex;

pub use vertex::Vertex;
