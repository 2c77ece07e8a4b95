//! Mapbox Vector Tile (MVT) encoding and decoding.
//!
//! - [`VectorTile`]: the top-level container holding layers.
//! - [`VectorTileLayer`]: one named layer with key and value tables.
//! - [`VectorTileFeature`]: tag indices plus geometry commands.

mod feature;
mod geometry_type;
mod layer;
mod property_manager;
mod tile;
mod value;

pub use feature::VectorTileFeature;
pub use geometry_type::GeomType;
pub use layer::{DEFAULT_EXTENT, VectorTileLayer};
pub use property_manager::{PropertyManager, VTLPMap};
pub use tile::VectorTile;
