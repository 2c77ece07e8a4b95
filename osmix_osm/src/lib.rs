//! OpenStreetMap data for osmix.
//!
//! * [`pbf`] decodes and encodes the OSM PBF format.
//! * [`EntityStore`] owns the nodes, ways and relations of one dataset.
//! * [`SpatialIndex`] answers range and nearest-neighbour queries against a store.
//! * [`diff`] reconciles two stores into an [`OsmChanges`] changeset.

mod area;
pub mod diff;
mod error;
mod keyed_list;
mod model;
pub mod pbf;
mod spatial;
mod store;

pub use area::way_is_area;
pub use diff::{ChangeStats, ChangeType, OsmChange, OsmChanges, diff};
pub use error::OsmixError;
pub use keyed_list::KeyedList;
pub use model::*;
pub use spatial::{IndexOptions, Neighbor, SpatialIndex};
pub use store::{EntityRef, EntityStore, StoreStats, ValidationIssue, ValidationReport};
