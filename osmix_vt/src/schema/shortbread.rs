//! A compact rendition of the Shortbread basemap schema.
//!
//! Each entity lands in at most one thematic layer, chosen by the first tag in [`KEY_ORDER`]
//! whose value classifies into a layer that accepts the entity's shape. Entities with a house
//! number are additionally written to `addresses`. The `(key, value)` classification is
//! memoised for the lifetime of the schema.

use super::{Candidate, LayerFeature, LayerSchema, Render, Shape};
use osmix_geometry::geo::{GeoProperties, GeoValue};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Layer {
	WaterPolygons,
	WaterLines,
	Land,
	Buildings,
	Streets,
	Boundaries,
	Pois,
	Places,
	Addresses,
}

impl Layer {
	fn name(self) -> &'static str {
		match self {
			Layer::WaterPolygons => "water_polygons",
			Layer::WaterLines => "water_lines",
			Layer::Land => "land",
			Layer::Buildings => "buildings",
			Layer::Streets => "streets",
			Layer::Boundaries => "boundaries",
			Layer::Pois => "pois",
			Layer::Places => "places",
			Layer::Addresses => "addresses",
		}
	}

	fn accepts(self, shape: Shape) -> bool {
		match self {
			Layer::WaterPolygons | Layer::Land | Layer::Buildings => shape == Shape::Polygon,
			Layer::WaterLines | Layer::Streets => shape == Shape::Line,
			Layer::Boundaries => shape != Shape::Point,
			Layer::Pois | Layer::Places => shape == Shape::Point,
			Layer::Addresses => true,
		}
	}
}

const KEY_ORDER: &[&str] = &[
	"building", "waterway", "water", "natural", "landuse", "leisure", "highway", "railway", "aeroway", "boundary",
	"place", "amenity", "shop", "tourism", "historic", "man_made", "office", "craft", "emergency",
];

const WATER_LINES: &[&str] = &["river", "canal", "stream", "ditch", "drain"];
const LAND_NATURAL: &[&str] = &[
	"wood", "scrub", "heath", "grassland", "beach", "sand", "bare_rock", "scree", "wetland",
];
const LAND_USE: &[&str] = &[
	"forest", "grass", "meadow", "residential", "commercial", "industrial", "retail", "farmland", "farmyard",
	"cemetery", "allotments", "orchard", "vineyard", "recreation_ground", "railway", "quarry", "brownfield",
];
const LAND_LEISURE: &[&str] = &["park", "garden", "pitch", "playground", "golf_course", "nature_reserve"];
const STREETS: &[&str] = &[
	"motorway", "motorway_link", "trunk", "trunk_link", "primary", "primary_link", "secondary", "secondary_link",
	"tertiary", "tertiary_link", "unclassified", "residential", "living_street", "service", "pedestrian", "track",
	"busway", "footway", "cycleway", "path", "steps", "bridleway",
];
const RAILWAYS: &[&str] = &["rail", "light_rail", "subway", "tram", "narrow_gauge", "monorail", "funicular"];
const PLACES: &[&str] = &[
	"country", "state", "city", "town", "village", "hamlet", "suburb", "quarter", "neighbourhood", "locality",
	"isolated_dwelling", "farm",
];
const POI_KEYS: &[&str] = &[
	"amenity", "shop", "tourism", "historic", "man_made", "office", "craft", "emergency",
];

fn classify(key: &str, value: &str) -> Option<Layer> {
	use Layer::*;
	Some(match (key, value) {
		(_, "no") => return None,
		("building", _) => Buildings,
		("waterway", "riverbank" | "dock") => WaterPolygons,
		("waterway", v) if WATER_LINES.contains(&v) => WaterLines,
		("water", _) | ("natural", "water" | "glacier") => WaterPolygons,
		("landuse", "reservoir" | "basin") | ("leisure", "swimming_pool") => WaterPolygons,
		("natural", v) if LAND_NATURAL.contains(&v) => Land,
		("landuse", v) if LAND_USE.contains(&v) => Land,
		("leisure", v) if LAND_LEISURE.contains(&v) => Land,
		("highway", v) if STREETS.contains(&v) => Streets,
		("railway", v) if RAILWAYS.contains(&v) => Streets,
		("aeroway", "runway" | "taxiway") => Streets,
		("boundary", "administrative") => Boundaries,
		("place", v) if PLACES.contains(&v) => Places,
		(k, _) if POI_KEYS.contains(&k) => Pois,
		_ => return None,
	})
}

/// Layers `water_polygons`, `water_lines`, `land`, `buildings`, `streets`, `boundaries`,
/// `pois`, `places` and `addresses` with `kind` and `name` attributes.
#[derive(Clone, Debug, Default)]
pub struct ShortbreadSchema {
	decisions: HashMap<String, HashMap<String, Option<Layer>>>,
}

impl ShortbreadSchema {
	#[must_use]
	pub fn new() -> ShortbreadSchema {
		ShortbreadSchema::default()
	}

	fn decide(&mut self, key: &str, value: &str) -> Option<Layer> {
		if let Some(decision) = self.decisions.get(key).and_then(|values| values.get(value)) {
			return *decision;
		}
		let decision = classify(key, value);
		self
			.decisions
			.entry(key.to_string())
			.or_default()
			.insert(value.to_string(), decision);
		decision
	}

	/// Number of memoised `(key, value)` decisions.
	#[must_use]
	pub fn memoised(&self) -> usize {
		self.decisions.values().map(HashMap::len).sum()
	}
}

fn insert_names(properties: &mut GeoProperties, candidate: &Candidate<'_>) {
	for (tag, attribute) in [("name", "name"), ("name:en", "name_en"), ("name:de", "name_de")] {
		if let Some(name) = candidate.tags.get(tag) {
			properties.insert(attribute.to_string(), GeoValue::from(name));
		}
	}
}

fn insert_number(properties: &mut GeoProperties, candidate: &Candidate<'_>, tag: &str) {
	if let Some(number) = candidate.tags.get(tag).and_then(|v| v.parse::<u64>().ok()) {
		properties.insert(tag.to_string(), GeoValue::UInt(number));
	}
}

impl LayerSchema for ShortbreadSchema {
	fn layers(&self) -> &'static [&'static str] {
		&[
			"water_polygons",
			"water_lines",
			"land",
			"buildings",
			"streets",
			"boundaries",
			"pois",
			"places",
			"addresses",
		]
	}

	fn assign(&mut self, candidate: &Candidate<'_>) -> Vec<LayerFeature> {
		let mut features = Vec::new();

		for key in KEY_ORDER {
			let Some(value) = candidate.tags.get(key) else {
				continue;
			};
			let Some(layer) = self.decide(key, value) else {
				continue;
			};
			if !layer.accepts(candidate.shape) {
				continue;
			}

			let mut properties = GeoProperties::new();
			properties.insert("kind".to_string(), GeoValue::from(value));
			insert_names(&mut properties, candidate);
			let mut render = Render::AsIs;
			match layer {
				Layer::Pois => properties.insert((*key).to_string(), GeoValue::from(value)),
				Layer::Places => insert_number(&mut properties, candidate, "population"),
				Layer::Boundaries => {
					insert_number(&mut properties, candidate, "admin_level");
					if candidate.shape == Shape::Polygon {
						render = Render::Outline;
					}
				}
				_ => {}
			}
			features.push(LayerFeature {
				layer: layer.name(),
				id: None,
				render,
				properties,
			});
			break;
		}

		if let Some(number) = candidate.tags.get("addr:housenumber") {
			let mut properties = GeoProperties::new();
			properties.insert("housenumber".to_string(), GeoValue::from(number));
			if let Some(street) = candidate.tags.get("addr:street") {
				properties.insert("street".to_string(), GeoValue::from(street));
			}
			features.push(LayerFeature {
				layer: Layer::Addresses.name(),
				id: None,
				render: if candidate.shape == Shape::Point {
					Render::AsIs
				} else {
					Render::Point
				},
				properties,
			});
		}

		features
	}
}
