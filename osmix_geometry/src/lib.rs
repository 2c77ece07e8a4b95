//! Geometry types, planar and spherical math, clipping and the vector tile codec.

mod clip;
pub mod geo;
pub mod math;
pub mod vector_tile;

pub use clip::clip_geometry;
