use super::{Candidate, LayerFeature, LayerSchema, Render};
use osmix_geometry::geo::{GeoProperties, GeoValue};
use osmix_osm::EntityKind;

/// One layer per entity kind. Attributes are the OSM tags plus `@id` and `@type`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSchema;

impl LayerSchema for DefaultSchema {
	fn layers(&self) -> &'static [&'static str] {
		&["nodes", "ways", "relations"]
	}

	fn assign(&mut self, candidate: &Candidate<'_>) -> Vec<LayerFeature> {
		if candidate.kind == EntityKind::Node && candidate.tags.is_empty() {
			return vec![];
		}
		let layer = match candidate.kind {
			EntityKind::Node => "nodes",
			EntityKind::Way => "ways",
			EntityKind::Relation => "relations",
		};

		let mut properties: GeoProperties = candidate
			.tags
			.iter()
			.map(|(key, value)| (key.clone(), GeoValue::from(value)))
			.collect();
		properties.insert("@id".to_string(), GeoValue::from(candidate.id));
		properties.insert("@type".to_string(), GeoValue::from(candidate.kind.as_str()));

		vec![LayerFeature {
			layer,
			id: u64::try_from(candidate.id).ok(),
			render: Render::AsIs,
			properties,
		}]
	}
}
