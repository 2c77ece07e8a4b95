use osmix_osm::IndexOptions;
use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
	/// Make ways findable by the centre of their bounding box.
	#[serde()]
	pub way_centroids: Option<bool>,

	/// Make relations findable by the centre of their bounding box.
	#[serde()]
	pub relation_centroids: Option<bool>,
}

impl IndexConfig {
	pub fn apply(&self, index: &mut IndexOptions) {
		if let Some(way_centroids) = self.way_centroids {
			index.way_centroids = way_centroids;
		}
		if let Some(relation_centroids) = self.relation_centroids {
			index.relation_centroids = relation_centroids;
		}
	}
}
