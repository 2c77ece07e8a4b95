//! [`SpatialIndex`]: static R-trees over the entities of one store generation.
//!
//! Three trees are bulk loaded at once:
//!  * planar `[lon, lat]` points for [`SpatialIndex::range_query`],
//!  * the same points on the unit sphere for [`SpatialIndex::nearest`], where euclidean
//!    (chord) order equals great-circle order,
//!  * bounding boxes of ways and relations for [`SpatialIndex::intersecting`].
//!
//! The index holds positions into its store. Every query checks the store generation and
//! fails with [`OsmixError::StaleIndex`] after any mutation.

use crate::{EntityKind, EntityRef, EntityStore, OsmixError};
use anyhow::Result;
use log::debug;
use osmix_core::GeoBBox;
use osmix_geometry::math::{chord_to_meters, haversine_distance, unit_vector};
use rstar::{
	AABB, RTree,
	primitives::{GeomWithData, Rectangle},
};
use std::fmt;

/// Distance in meters under which two candidates count as equally far.
const TIE_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexOptions {
	/// Also index the bbox centre of every way.
	pub way_centroids: bool,
	/// Also index the bbox centre of every relation.
	pub relation_centroids: bool,
}

/// A result of [`SpatialIndex::nearest`]. `distance` is in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
	pub entity: EntityRef,
	pub id: i64,
	pub distance: f64,
}

#[derive(Clone, Copy)]
struct Entry {
	entity: EntityRef,
	id: i64,
	position: [f64; 2],
}

type PlanarPoint = GeomWithData<[f64; 2], Entry>;
type SpherePoint = GeomWithData<[f64; 3], Entry>;
type Envelope = GeomWithData<Rectangle<[f64; 2]>, EntityRef>;

pub struct SpatialIndex {
	generation: u64,
	options: IndexOptions,
	planar: RTree<PlanarPoint>,
	sphere: RTree<SpherePoint>,
	envelopes: RTree<Envelope>,
}

fn to_aabb(bbox: &GeoBBox) -> AABB<[f64; 2]> {
	AABB::from_corners([bbox.x_min, bbox.y_min], [bbox.x_max, bbox.y_max])
}

impl SpatialIndex {
	/// Bulk loads the index for the current generation of `store`.
	#[must_use]
	pub fn build(store: &EntityStore, options: IndexOptions) -> SpatialIndex {
		let mut entries: Vec<Entry> = store
			.nodes()
			.map(|(entity, node)| Entry {
				entity,
				id: node.id,
				position: node.position(),
			})
			.collect();
		let mut envelopes: Vec<Envelope> = Vec::new();

		let ways = store.ways().map(|(entity, way)| (entity, way.id));
		let relations = store.relations().map(|(entity, relation)| (entity, relation.id));
		for (entity, id) in ways.chain(relations) {
			let Some(bbox) = store.bbox_of(entity) else {
				continue;
			};
			envelopes.push(GeomWithData::new(
				Rectangle::from_corners([bbox.x_min, bbox.y_min], [bbox.x_max, bbox.y_max]),
				entity,
			));
			let wanted = match entity.kind {
				EntityKind::Way => options.way_centroids,
				EntityKind::Relation => options.relation_centroids,
				EntityKind::Node => false,
			};
			if wanted {
				entries.push(Entry {
					entity,
					id,
					position: bbox.center(),
				});
			}
		}

		let planar = entries.iter().map(|e| GeomWithData::new(e.position, *e)).collect();
		let sphere = entries
			.iter()
			.map(|e| GeomWithData::new(unit_vector(e.position), *e))
			.collect();

		let index = SpatialIndex {
			generation: store.generation(),
			options,
			planar: RTree::bulk_load(planar),
			sphere: RTree::bulk_load(sphere),
			envelopes: RTree::bulk_load(envelopes),
		};
		debug!("built {index:?}");
		index
	}

	#[must_use]
	pub fn generation(&self) -> u64 {
		self.generation
	}

	#[must_use]
	pub fn options(&self) -> IndexOptions {
		self.options
	}

	/// Number of indexed points.
	#[must_use]
	pub fn len(&self) -> usize {
		self.planar.size()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Fails if `store` changed since the index was built.
	pub fn check(&self, store: &EntityStore) -> Result<()> {
		if store.generation() == self.generation {
			Ok(())
		} else {
			Err(OsmixError::StaleIndex {
				built: self.generation,
				current: store.generation(),
			}
			.into())
		}
	}

	/// Indexed points inside `bbox`, edges included, ordered by kind and store position.
	pub fn range_query(&self, store: &EntityStore, bbox: &GeoBBox) -> Result<Vec<EntityRef>> {
		self.check(store)?;
		let mut refs: Vec<EntityRef> = self
			.planar
			.locate_in_envelope(&to_aabb(bbox))
			.map(|point| point.data.entity)
			.collect();
		refs.sort_unstable();
		Ok(refs)
	}

	/// Ways and relations whose bounding box intersects `bbox`, ordered by kind and store position.
	pub fn intersecting(&self, store: &EntityStore, bbox: &GeoBBox) -> Result<Vec<EntityRef>> {
		self.check(store)?;
		let mut refs: Vec<EntityRef> = self
			.envelopes
			.locate_in_envelope_intersecting(&to_aabb(bbox))
			.map(|envelope| envelope.data)
			.collect();
		refs.sort_unstable();
		Ok(refs)
	}

	/// The `k` indexed points closest to `point` (`[lon, lat]`) by great-circle distance.
	///
	/// Results are ordered by ascending distance, equal distances by ascending id. With
	/// `max_distance` (meters) farther points are left out.
	pub fn nearest(
		&self,
		store: &EntityStore,
		point: [f64; 2],
		k: usize,
		max_distance: Option<f64>,
	) -> Result<Vec<Neighbor>> {
		self.nearest_filtered(store, point, k, max_distance, |_| true)
	}

	/// Like [`SpatialIndex::nearest`], but only considers entities accepted by `predicate`.
	pub fn nearest_filtered(
		&self,
		store: &EntityStore,
		point: [f64; 2],
		k: usize,
		max_distance: Option<f64>,
		predicate: impl Fn(EntityRef) -> bool,
	) -> Result<Vec<Neighbor>> {
		self.check(store)?;
		if k == 0 {
			return Ok(Vec::new());
		}

		let mut found: Vec<Neighbor> = Vec::new();
		let mut kth_distance: Option<f64> = None;
		for (candidate, distance_2) in self.sphere.nearest_neighbor_iter_with_distance_2(&unit_vector(point)) {
			let chord_distance = chord_to_meters(distance_2.sqrt());
			if max_distance.is_some_and(|max| chord_distance > max + TIE_EPSILON) {
				break;
			}
			// keep collecting candidates tied with the k-th one
			if kth_distance.is_some_and(|kth| chord_distance > kth + TIE_EPSILON) {
				break;
			}
			let entry = &candidate.data;
			if !predicate(entry.entity) {
				continue;
			}
			let distance = haversine_distance(point, entry.position);
			if max_distance.is_some_and(|max| distance > max) {
				continue;
			}
			found.push(Neighbor {
				entity: entry.entity,
				id: entry.id,
				distance,
			});
			if found.len() == k {
				kth_distance = Some(chord_distance);
			}
		}

		order_neighbors(&mut found);
		found.truncate(k);
		Ok(found)
	}
}

impl fmt::Debug for SpatialIndex {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SpatialIndex")
			.field("generation", &self.generation)
			.field("points", &self.planar.size())
			.field("envelopes", &self.envelopes.size())
			.finish()
	}
}

/// Sorts by distance; a run of neighbors within [`TIE_EPSILON`] of the run's closest one is
/// ordered by id.
fn order_neighbors(found: &mut [Neighbor]) {
	found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
	let mut start = 0;
	while start < found.len() {
		let closest = found[start].distance;
		let tied = found[start..]
			.iter()
			.take_while(|neighbor| neighbor.distance - closest <= TIE_EPSILON)
			.count();
		found[start..start + tied].sort_by_key(|neighbor| (neighbor.id, neighbor.entity));
		start += tied;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{OsmNode, OsmWay, Tags};
	use approx::assert_abs_diff_eq;
	use rstest::rstest;

	fn grid() -> Result<EntityStore> {
		let mut store = EntityStore::default();
		let mut id = 1;
		for x in 0..10 {
			for y in 0..10 {
				store.create(OsmNode::new(id, f64::from(x) * 0.01, f64::from(y) * 0.01))?;
				id += 1;
			}
		}
		store.create(OsmWay::new(1000, vec![1, 2, 12, 11, 1]).with_tags(Tags::from(vec![("building", "yes")])))?;
		Ok(store)
	}

	#[test]
	fn range_query_includes_edges() -> Result<()> {
		let store = grid()?;
		let index = SpatialIndex::build(&store, IndexOptions::default());
		assert_eq!(index.len(), 100);
		let refs = index.range_query(&store, &GeoBBox::new(0.0, 0.0, 0.01, 0.01)?)?;
		let ids: Vec<i64> = refs.iter().filter_map(|r| store.id_of(*r)).collect();
		assert_eq!(ids, vec![1, 2, 11, 12]);
		Ok(())
	}

	#[test]
	fn nearest_orders_by_distance() -> Result<()> {
		let store = grid()?;
		let index = SpatialIndex::build(&store, IndexOptions::default());
		let neighbors = index.nearest(&store, [0.0201, 0.0301], 3, None)?;
		assert_eq!(neighbors[0].id, 24);
		assert!(neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
		assert_abs_diff_eq!(
			neighbors[0].distance,
			haversine_distance([0.0201, 0.0301], [0.02, 0.03]),
			epsilon = 1e-9
		);
		Ok(())
	}

	#[rstest]
	#[case(1)]
	#[case(2)]
	#[case(4)]
	fn ties_break_by_id(#[case] k: usize) -> Result<()> {
		// four nodes at the same distance from the query point, inserted in shuffled order
		let mut store = EntityStore::default();
		for (id, lon, lat) in [(7, 1.0, 0.0), (3, 0.0, 1.0), (9, -1.0, 0.0), (5, 0.0, -1.0)] {
			store.create(OsmNode::new(id, lon, lat))?;
		}
		let index = SpatialIndex::build(&store, IndexOptions::default());
		let ids: Vec<i64> = index.nearest(&store, [0.0, 0.0], k, None)?.iter().map(|n| n.id).collect();
		assert_eq!(ids, [3, 5, 7, 9][..k].to_vec());
		Ok(())
	}

	#[test]
	fn near_ties_straddling_a_rounding_step_break_by_id() {
		let neighbor = |id: i64, distance: f64| Neighbor {
			entity: EntityRef {
				kind: EntityKind::Node,
				index: 0,
			},
			id,
			distance,
		};
		let mut found = vec![
			neighbor(4, 2.0),
			neighbor(2, 1.000_000_4),
			neighbor(1, 1.000_000_6),
			neighbor(3, 1.5),
		];
		order_neighbors(&mut found);
		let ids: Vec<i64> = found.iter().map(|n| n.id).collect();
		assert_eq!(ids, vec![1, 2, 3, 4]);
	}

	#[test]
	fn nearest_respects_max_distance_and_predicate() -> Result<()> {
		let store = grid()?;
		let index = SpatialIndex::build(&store, IndexOptions::default());
		// neighbouring grid nodes are about 1112 m apart
		let neighbors = index.nearest(&store, [0.0, 0.0], 10, Some(1200.0))?;
		let ids: Vec<i64> = neighbors.iter().map(|n| n.id).collect();
		assert_eq!(ids, vec![1, 2, 11]);

		let even = index.nearest_filtered(&store, [0.0, 0.0], 1, None, |r| store.id_of(r).is_some_and(|id| id % 2 == 0))?;
		assert_eq!(even[0].id, 2);
		assert!(index.nearest(&store, [0.0, 0.0], 0, None)?.is_empty());
		Ok(())
	}

	#[test]
	fn way_centroids_and_envelopes() -> Result<()> {
		let store = grid()?;
		let options = IndexOptions {
			way_centroids: true,
			relation_centroids: false,
		};
		let index = SpatialIndex::build(&store, options);
		assert_eq!(index.len(), 101);
		let near = index.nearest(&store, [0.005, 0.005], 1, None)?;
		assert_eq!(near[0].entity.kind, EntityKind::Way);
		assert_eq!(near[0].id, 1000);

		let hits = index.intersecting(&store, &GeoBBox::new(0.005, 0.005, 0.5, 0.5)?)?;
		assert_eq!(hits, vec![EntityRef::new(EntityKind::Way, 0)]);
		assert!(index.intersecting(&store, &GeoBBox::new(0.05, 0.05, 0.5, 0.5)?)?.is_empty());
		Ok(())
	}

	#[test]
	fn stale_index() -> Result<()> {
		let mut store = grid()?;
		let index = SpatialIndex::build(&store, IndexOptions::default());
		store.delete(EntityKind::Node, 1)?;
		let error = index.range_query(&store, &GeoBBox::new(0.0, 0.0, 1.0, 1.0)?).unwrap_err();
		assert!(matches!(
			OsmixError::find(&error),
			Some(OsmixError::StaleIndex { .. })
		));
		let rebuilt = SpatialIndex::build(&store, IndexOptions::default());
		assert_eq!(rebuilt.len(), 99);
		Ok(())
	}
}
