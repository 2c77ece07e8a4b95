mod blob;
mod geo_bbox;
mod limited_cache;
mod tile_coord;

pub use blob::*;
pub use geo_bbox::*;
pub use limited_cache::*;
pub use tile_coord::*;
