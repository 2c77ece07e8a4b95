use crate::{
	TileConfig, TileProfile,
	multipolygon::{assemble_multipolygon, is_multipolygon},
	projection::TileProjection,
	schema::{Candidate, DefaultSchema, LayerSchema, Render, Shape, ShortbreadSchema},
};
use anyhow::{Context, Result};
use log::{debug, trace};
use osmix_core::{Blob, LimitedCache, TileCoord};
use osmix_geometry::{
	clip_geometry,
	geo::{GeoFeature, Geometry},
	vector_tile::{VectorTile, VectorTileLayer},
};
use osmix_osm::{EntityKind, EntityStore, SpatialIndex, way_is_area};
use std::collections::HashMap;

/// A loaded dataset as seen by a tile encoder.
#[derive(Clone, Copy)]
pub struct TileSource<'a> {
	pub store: &'a EntityStore,
	pub index: &'a SpatialIndex,
}

impl<'a> TileSource<'a> {
	#[must_use]
	pub fn new(store: &'a EntityStore, index: &'a SpatialIndex) -> TileSource<'a> {
		TileSource { store, index }
	}
}

/// Produces encoded tiles for one dataset.
///
/// A tile with no features encodes to an empty blob.
pub trait TileEncoderStrategy: Send {
	fn get_tile(&mut self, source: &TileSource<'_>, coord: &TileCoord) -> Result<Blob>;
}

/// Default tile cache budget in bytes.
pub const DEFAULT_TILE_CACHE_SIZE: usize = 16 * 1024 * 1024;

/// Encodes tiles with a [`LayerSchema`] and memoises the results.
///
/// The cache is dropped whenever the store generation differs from the one the cached
/// tiles were built from.
pub struct VtEncoder<S: LayerSchema> {
	config: TileConfig,
	schema: S,
	cache: LimitedCache<TileCoord, Blob>,
	generation: Option<u64>,
}

pub type DefaultStrategy = VtEncoder<DefaultSchema>;
pub type ShortbreadStrategy = VtEncoder<ShortbreadSchema>;

/// Creates the strategy selected by `config.profile`.
#[must_use]
pub fn strategy_for(config: &TileConfig, cache_size: usize) -> Box<dyn TileEncoderStrategy> {
	match config.profile {
		TileProfile::Default => Box::new(VtEncoder::new(*config, DefaultSchema, cache_size)),
		TileProfile::Shortbread => Box::new(VtEncoder::new(*config, ShortbreadSchema::new(), cache_size)),
	}
}

fn outline(geometry: Geometry) -> Geometry {
	match geometry {
		Geometry::MultiPolygon(polygons) => Geometry::MultiLineString(polygons.into_iter().flatten().collect()),
		other => other,
	}
}

fn representative_point(geometry: &Geometry) -> Option<Geometry> {
	let [x_min, y_min, x_max, y_max] = geometry.bbox()?;
	Some(Geometry::new_point([(x_min + x_max) / 2.0, (y_min + y_max) / 2.0]))
}

struct TileBuilder<'s, S: LayerSchema> {
	schema: &'s mut S,
	projection: TileProjection,
	layers: HashMap<&'static str, Vec<GeoFeature>>,
}

impl<S: LayerSchema> TileBuilder<'_, S> {
	/// Offers the candidate to the schema and adds the resulting features.
	/// `geometry` yields `[lon, lat]` geometry and runs only if the schema takes the candidate.
	fn offer(&mut self, candidate: &Candidate<'_>, geometry: impl FnOnce() -> Option<Geometry>) {
		let assigned = self.schema.assign(candidate);
		if assigned.is_empty() {
			return;
		}
		let Some(geometry) = geometry() else {
			trace!("{} {} has no usable geometry", candidate.kind, candidate.id);
			return;
		};
		let projection = self.projection;
		let geometry = geometry.map_coordinates(|position| projection.project(position));
		let rect = projection.clip_rect();

		for feature in assigned {
			let shaped = match feature.render {
				Render::AsIs => Some(geometry.clone()),
				Render::Outline => Some(outline(geometry.clone())),
				Render::Point => representative_point(&geometry),
			};
			let Some(clipped) = shaped.and_then(|shaped| clip_geometry(shaped, rect)) else {
				continue;
			};
			let mut geo_feature = GeoFeature::new(clipped);
			geo_feature.id = feature.id;
			geo_feature.properties = feature.properties;
			self.layers.entry(feature.layer).or_default().push(geo_feature);
		}
	}
}

impl<S: LayerSchema> VtEncoder<S> {
	#[must_use]
	pub fn new(config: TileConfig, schema: S, cache_size: usize) -> VtEncoder<S> {
		VtEncoder {
			config,
			schema,
			cache: LimitedCache::with_maximum_size(cache_size),
			generation: None,
		}
	}

	#[must_use]
	pub fn config(&self) -> &TileConfig {
		&self.config
	}

	/// Builds the tile without consulting the cache.
	pub fn encode(&mut self, source: &TileSource<'_>, coord: &TileCoord) -> Result<VectorTile> {
		let store = source.store;
		let projection = TileProjection::new(coord, &self.config);
		let bbox = projection.query_bbox();
		let mut builder = TileBuilder {
			schema: &mut self.schema,
			projection,
			layers: HashMap::new(),
		};

		for entity in source.index.range_query(store, &bbox)? {
			if entity.kind != EntityKind::Node {
				continue;
			}
			let Some(node) = store.node_at(entity.index) else {
				continue;
			};
			if node.tags.is_empty() {
				continue;
			}
			let candidate = Candidate {
				kind: EntityKind::Node,
				id: node.id,
				tags: &node.tags,
				shape: Shape::Point,
			};
			builder.offer(&candidate, || Some(Geometry::new_point(node.position())));
		}

		for entity in source.index.intersecting(store, &bbox)? {
			match entity.kind {
				EntityKind::Way => {
					let Some(way) = store.way_at(entity.index) else {
						continue;
					};
					let shape = if way_is_area(&way.refs, &way.tags) {
						Shape::Polygon
					} else {
						Shape::Line
					};
					let candidate = Candidate {
						kind: EntityKind::Way,
						id: way.id,
						tags: &way.tags,
						shape,
					};
					builder.offer(&candidate, || {
						let coordinates = store.way_coordinates(way);
						match shape {
							Shape::Polygon if coordinates.len() >= 4 => Some(Geometry::new_polygon(vec![coordinates])),
							Shape::Line if coordinates.len() >= 2 => Some(Geometry::new_line_string(coordinates)),
							_ => None,
						}
					});
				}
				EntityKind::Relation => {
					let Some(relation) = store.relation_at(entity.index) else {
						continue;
					};
					if !is_multipolygon(relation) {
						continue;
					}
					let candidate = Candidate {
						kind: EntityKind::Relation,
						id: relation.id,
						tags: &relation.tags,
						shape: Shape::Polygon,
					};
					builder.offer(&candidate, || {
						let polygons = assemble_multipolygon(store, relation);
						(!polygons.is_empty()).then_some(Geometry::MultiPolygon(polygons))
					});
				}
				EntityKind::Node => {}
			}
		}

		let mut features_by_layer = builder.layers;
		let mut layers = Vec::new();
		for name in self.schema.layers() {
			let Some(features) = features_by_layer.remove(name) else {
				continue;
			};
			layers.push(
				VectorTileLayer::from_features((*name).to_string(), features, self.config.extent, 2)
					.with_context(|| format!("Failed to build layer '{name}' of tile {coord}"))?,
			);
		}
		Ok(VectorTile::new(layers))
	}
}

impl<S: LayerSchema> TileEncoderStrategy for VtEncoder<S> {
	fn get_tile(&mut self, source: &TileSource<'_>, coord: &TileCoord) -> Result<Blob> {
		let generation = source.store.generation();
		if self.generation != Some(generation) {
			self.cache.clear();
			self.generation = Some(generation);
		}
		if let Some(blob) = self.cache.get(coord) {
			trace!("tile {coord} served from cache");
			return Ok(blob);
		}

		let blob = self
			.encode(source, coord)?
			.to_blob()
			.with_context(|| format!("Failed to encode tile {coord}"))?;
		debug!("encoded tile {coord}: {} bytes", blob.len());
		Ok(self.cache.add(*coord, blob))
	}
}
