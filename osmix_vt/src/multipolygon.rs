//! Polygon assembly for `type=multipolygon` and `type=boundary` relations.
//!
//! Member ways are joined at shared end nodes into closed rings. Rings from `outer` (or
//! role-less) members become exteriors; each `inner` ring is attached to the first exterior
//! that contains its first vertex. Rings that cannot be closed, or that reference nodes
//! missing from the store, are dropped.

use log::trace;
use osmix_geometry::{
	geo::{Coordinates1, Coordinates3},
	math::ring_contains,
};
use osmix_osm::{EntityKind, EntityStore, OsmRelation};

/// Whether the relation describes an area built from its member ways.
#[must_use]
pub fn is_multipolygon(relation: &OsmRelation) -> bool {
	matches!(relation.tags.get("type"), Some("multipolygon" | "boundary"))
}

/// Joins open node sequences at matching ends until they close.
fn join_rings(mut segments: Vec<Vec<i64>>) -> Vec<Vec<i64>> {
	let mut rings = Vec::new();
	while let Some(mut ring) = segments.pop() {
		while ring.len() >= 2 && ring.first() != ring.last() {
			let Some(&end) = ring.last() else { break };
			let Some(position) = segments
				.iter()
				.position(|segment| segment.first() == Some(&end) || segment.last() == Some(&end))
			else {
				break;
			};
			let mut next = segments.swap_remove(position);
			if next.first() != Some(&end) {
				next.reverse();
			}
			ring.extend(next.into_iter().skip(1));
		}
		if ring.len() >= 4 && ring.first() == ring.last() {
			rings.push(ring);
		} else {
			trace!("dropping unclosed ring of {} nodes", ring.len());
		}
	}
	rings
}

fn resolve_ring(store: &EntityStore, ring: &[i64]) -> Option<Coordinates1> {
	ring.iter().map(|id| Some(store.node(*id)?.position())).collect()
}

/// Assembles the relation's polygons in `[lon, lat]` degrees. Empty if no ring closes.
#[must_use]
pub fn assemble_multipolygon(store: &EntityStore, relation: &OsmRelation) -> Coordinates3 {
	let mut outer = Vec::new();
	let mut inner = Vec::new();
	for member in relation.members.iter().filter(|m| m.kind == EntityKind::Way) {
		let Some(way) = store.way(member.ref_id) else {
			continue;
		};
		match member.role.as_str() {
			"inner" => inner.push(way.refs.clone()),
			"outer" | "" => outer.push(way.refs.clone()),
			role => trace!("relation {}: ignoring member role '{role}'", relation.id),
		}
	}

	let mut polygons: Coordinates3 = join_rings(outer)
		.iter()
		.filter_map(|ring| resolve_ring(store, ring))
		.map(|ring| vec![ring])
		.collect();

	for ring in join_rings(inner).iter().filter_map(|ring| resolve_ring(store, ring)) {
		match polygons.iter_mut().find(|polygon| ring_contains(&polygon[0], ring[0])) {
			Some(polygon) => polygon.push(ring),
			None => trace!("relation {}: inner ring outside every outer ring", relation.id),
		}
	}
	polygons
}
