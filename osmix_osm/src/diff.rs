//! Changesets between two entity stores.
//!
//! [`diff`] joins both stores by id, one kind at a time: ids only in the patch are creates,
//! ids only in the base are deletes, and ids in both whose tags or geometry differ are
//! modifies. Node geometry is the coordinate, way geometry the ref sequence and relation
//! geometry the member sequence; both sequences are order sensitive.

use crate::{EntityKind, EntityStore, OsmNode, OsmRelation, OsmWay, model::Element};
use std::{collections::BTreeMap, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
	Create,
	Modify,
	Delete,
}

impl ChangeType {
	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			ChangeType::Create => "create",
			ChangeType::Modify => "modify",
			ChangeType::Delete => "delete",
		}
	}
}

impl fmt::Display for ChangeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One changed entity.
///
/// `entity` is the patch version for creates and modifies and the base version for deletes.
/// `previous` holds the base version of a modify.
#[derive(Clone, Debug, PartialEq)]
pub struct OsmChange<T> {
	pub change_type: ChangeType,
	pub entity: T,
	pub previous: Option<T>,
}

/// Changes per kind, ordered by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OsmChanges {
	pub nodes: BTreeMap<i64, OsmChange<OsmNode>>,
	pub ways: BTreeMap<i64, OsmChange<OsmWay>>,
	pub relations: BTreeMap<i64, OsmChange<OsmRelation>>,
}

/// Number of creates, modifies and deletes of one kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeStats {
	pub create: usize,
	pub modify: usize,
	pub delete: usize,
}

impl ChangeStats {
	fn count<T>(changes: &BTreeMap<i64, OsmChange<T>>) -> ChangeStats {
		let mut stats = ChangeStats::default();
		for change in changes.values() {
			match change.change_type {
				ChangeType::Create => stats.create += 1,
				ChangeType::Modify => stats.modify += 1,
				ChangeType::Delete => stats.delete += 1,
			}
		}
		stats
	}

	#[must_use]
	pub fn total(&self) -> usize {
		self.create + self.modify + self.delete
	}
}

impl fmt::Display for ChangeStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} created, {} modified, {} deleted",
			self.create, self.modify, self.delete
		)
	}
}

impl OsmChanges {
	#[must_use]
	pub fn stats(&self, kind: EntityKind) -> ChangeStats {
		match kind {
			EntityKind::Node => ChangeStats::count(&self.nodes),
			EntityKind::Way => ChangeStats::count(&self.ways),
			EntityKind::Relation => ChangeStats::count(&self.relations),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len() + self.ways.len() + self.relations.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn diff_kind<'a, T: Element + 'a>(
	base: impl Iterator<Item = &'a T>,
	patch: impl Iterator<Item = &'a T>,
	lookup_base: impl Fn(i64) -> Option<&'a T>,
	lookup_patch: impl Fn(i64) -> Option<&'a T>,
) -> BTreeMap<i64, OsmChange<T>> {
	let mut changes = BTreeMap::new();
	for entity in base {
		match lookup_patch(entity.id()) {
			None => {
				changes.insert(
					entity.id(),
					OsmChange {
						change_type: ChangeType::Delete,
						entity: entity.clone(),
						previous: None,
					},
				);
			}
			Some(patched) if patched != entity => {
				changes.insert(
					entity.id(),
					OsmChange {
						change_type: ChangeType::Modify,
						entity: patched.clone(),
						previous: Some(entity.clone()),
					},
				);
			}
			Some(_) => {}
		}
	}
	for entity in patch.filter(|entity| lookup_base(entity.id()).is_none()) {
		changes.insert(
			entity.id(),
			OsmChange {
				change_type: ChangeType::Create,
				entity: entity.clone(),
				previous: None,
			},
		);
	}
	changes
}

/// Computes the changes that turn `base` into `patch`.
#[must_use]
pub fn diff(base: &EntityStore, patch: &EntityStore) -> OsmChanges {
	OsmChanges {
		nodes: diff_kind(
			base.nodes().map(|(_, n)| n),
			patch.nodes().map(|(_, n)| n),
			|id| base.node(id),
			|id| patch.node(id),
		),
		ways: diff_kind(
			base.ways().map(|(_, w)| w),
			patch.ways().map(|(_, w)| w),
			|id| base.way(id),
			|id| patch.way(id),
		),
		relations: diff_kind(
			base.relations().map(|(_, r)| r),
			patch.relations().map(|(_, r)| r),
			|id| base.relation(id),
			|id| patch.relation(id),
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{RelationMember, Tags};
	use anyhow::Result;

	fn base() -> Result<EntityStore> {
		let mut store = EntityStore::default();
		store.create(OsmNode::new(1, 0.0, 0.0))?;
		store.create(OsmNode::new(2, 1.0, 0.0))?;
		store.create(OsmNode::new(3, 1.0, 1.0))?;
		store.create(OsmWay::new(10, vec![1, 2, 3]).with_tags(Tags::from(vec![("highway", "residential")])))?;
		store.create(OsmRelation::new(
			20,
			vec![RelationMember::new(EntityKind::Way, 10, "")],
		))?;
		Ok(store)
	}

	#[test]
	fn identical_stores() -> Result<()> {
		let store = base()?;
		let changes = diff(&store, &store);
		assert!(changes.is_empty());
		for kind in EntityKind::ALL {
			assert_eq!(changes.stats(kind).total(), 0);
		}
		Ok(())
	}

	#[test]
	fn one_added_node() -> Result<()> {
		let base = base()?;
		let mut patch = base.clone();
		patch.create(OsmNode::new(4, 2.0, 2.0))?;
		let changes = diff(&base, &patch);
		assert_eq!(changes.len(), 1);
		assert_eq!(
			changes.stats(EntityKind::Node),
			ChangeStats {
				create: 1,
				modify: 0,
				delete: 0
			}
		);
		assert_eq!(changes.nodes[&4].entity.id, 4);
		assert!(changes.ways.is_empty() && changes.relations.is_empty());
		Ok(())
	}

	#[test]
	fn modify_and_delete() -> Result<()> {
		let base = base()?;
		let mut patch = base.clone();
		patch.modify(OsmNode::new(2, 1.000_000_1, 0.0))?;
		patch.modify(OsmWay::new(10, vec![3, 2, 1]).with_tags(Tags::from(vec![("highway", "residential")])))?;
		patch.delete(EntityKind::Relation, 20)?;
		// same content as before: no change
		patch.modify(OsmNode::new(1, 0.0, 0.0))?;

		let changes = diff(&base, &patch);
		assert_eq!(changes.nodes.keys().collect::<Vec<_>>(), vec![&2]);
		let node = &changes.nodes[&2];
		assert_eq!(node.change_type, ChangeType::Modify);
		assert_eq!(node.previous.as_ref().map(|n| n.lon), Some(10_000_000));
		assert_eq!(changes.ways[&10].change_type, ChangeType::Modify);
		assert_eq!(changes.relations[&20].change_type, ChangeType::Delete);
		assert_eq!(changes.relations[&20].entity.members.len(), 1);
		assert_eq!(changes.stats(EntityKind::Way).to_string(), "0 created, 1 modified, 0 deleted");
		Ok(())
	}

	#[test]
	fn applying_a_diff_reproduces_the_patch() -> Result<()> {
		let base = base()?;
		let mut patch = base.clone();
		patch.delete(EntityKind::Node, 3)?;
		patch.create(OsmNode::new(5, 3.0, 3.0).with_tags(Tags::from(vec![("amenity", "cafe")])))?;
		patch.modify(OsmWay::new(10, vec![1, 2, 5]))?;

		let mut applied = base.clone();
		applied.apply_changes(&diff(&base, &patch))?;
		assert!(diff(&applied, &patch).is_empty());
		assert_eq!(applied.search("amenity", Some("cafe")).len(), 1);
		Ok(())
	}
}
