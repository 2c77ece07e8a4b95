//! Layer schemas decide which layers an entity lands in and which attributes it carries.
//!
//! The encoder hands every selected entity to the schema as a [`Candidate`] before building
//! any geometry, so entities the schema rejects cost no projection or clipping work.

mod default;
mod shortbread;

pub use default::DefaultSchema;
use osmix_geometry::geo::GeoProperties;
use osmix_osm::{EntityKind, Tags};
pub use shortbread::ShortbreadSchema;

/// Geometry class of a candidate, known before its coordinates are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
	Point,
	Line,
	Polygon,
}

/// An entity offered to a schema.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
	pub kind: EntityKind,
	pub id: i64,
	pub tags: &'a Tags,
	pub shape: Shape,
}

/// How the entity geometry is turned into the feature geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Render {
	AsIs,
	/// Polygon rings as lines.
	Outline,
	/// A single point at the centre of the geometry's bounding box.
	Point,
}

/// One feature a schema emits for a candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerFeature {
	pub layer: &'static str,
	pub id: Option<u64>,
	pub render: Render,
	pub properties: GeoProperties,
}

pub trait LayerSchema: Send {
	/// Layer names in the order they are written to the tile.
	fn layers(&self) -> &'static [&'static str];

	/// Features to emit for `candidate`; empty to skip it.
	fn assign(&mut self, candidate: &Candidate<'_>) -> Vec<LayerFeature>;
}
