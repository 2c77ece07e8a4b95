//! Vector tiles from an [`EntityStore`](osmix_osm::EntityStore).
//!
//! For a tile `(z, x, y)` the encoder selects tagged nodes inside the buffered tile through
//! the spatial index, plus ways and multipolygon relations whose bounding box intersects it.
//! A [`LayerSchema`](schema::LayerSchema) assigns each of them to layers and attributes; the
//! geometry is projected to Web Mercator tile coordinates, clipped to the buffer and written
//! as a Mapbox Vector Tile.
//!
//! ```no_run
//! use osmix_core::TileCoord;
//! use osmix_osm::{EntityStore, IndexOptions, SpatialIndex};
//! use osmix_vt::{TileConfig, TileSource, strategy_for, DEFAULT_TILE_CACHE_SIZE};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = EntityStore::default();
//! let index = SpatialIndex::build(&store, IndexOptions::default());
//! let mut strategy = strategy_for(&TileConfig::default(), DEFAULT_TILE_CACHE_SIZE);
//! let tile = strategy.get_tile(&TileSource::new(&store, &index), &TileCoord::new(0, 0, 0)?)?;
//! assert!(tile.is_empty());
//! # Ok(())
//! # }
//! ```

mod config;
mod encoder;
pub mod multipolygon;
mod projection;
pub mod schema;

pub use config::{TileConfig, TileProfile};
pub use encoder::{
	DEFAULT_TILE_CACHE_SIZE, DefaultStrategy, ShortbreadStrategy, TileEncoderStrategy, TileSource, VtEncoder,
	strategy_for,
};
pub use projection::TileProjection;
