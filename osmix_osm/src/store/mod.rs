//! [`EntityStore`]: the nodes, ways and relations of one dataset.
//!
//! Entities live in one dense table per kind and are addressed by [`EntityRef`]. A tag index
//! maps every tag key to the entities carrying it. Every mutation increases the store's
//! generation, which lets derived structures such as the
//! [`SpatialIndex`](crate::SpatialIndex) detect that they are stale.

mod table;
mod validation;

pub use validation::{ValidationIssue, ValidationReport};

use crate::{
	ChangeType, EntityKind, KeyedList, OsmChange, OsmChanges, OsmEntity, OsmHeader, OsmNode, OsmRelation, OsmWay,
	OsmixError, Tags,
	model::Element,
	pbf::{PbfReader, PbfWriter},
};
use anyhow::{Context, Result};
use log::{debug, info};
use osmix_core::{Blob, GeoBBox};
use std::collections::HashSet;
use table::Table;

/// Position of an entity in its store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
	pub kind: EntityKind,
	pub index: usize,
}

impl EntityRef {
	#[must_use]
	pub fn new(kind: EntityKind, index: usize) -> EntityRef {
		EntityRef { kind, index }
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
	pub nodes: usize,
	pub ways: usize,
	pub relations: usize,
}

impl StoreStats {
	#[must_use]
	pub fn total(&self) -> usize {
		self.nodes + self.ways + self.relations
	}
}

#[derive(Clone, Debug)]
pub struct EntityStore {
	header: OsmHeader,
	nodes: Table<OsmNode>,
	ways: Table<OsmWay>,
	relations: Table<OsmRelation>,
	tag_index: KeyedList<String, EntityRef>,
	generation: u64,
	report: ValidationReport,
}

impl Default for EntityStore {
	fn default() -> Self {
		EntityStore::new(OsmHeader::default())
	}
}

fn merge_bbox(target: &mut Option<GeoBBox>, bbox: GeoBBox) {
	match target {
		Some(target) => target.extend(&bbox),
		None => *target = Some(bbox),
	}
}

fn not_found(kind: EntityKind, id: i64) -> anyhow::Error {
	OsmixError::EntityNotFound { kind, id }.into()
}

impl EntityStore {
	#[must_use]
	pub fn new(header: OsmHeader) -> EntityStore {
		EntityStore {
			header,
			nodes: Table::new(),
			ways: Table::new(),
			relations: Table::new(),
			tag_index: KeyedList::new(),
			generation: 0,
			report: ValidationReport::default(),
		}
	}

	/// Decodes a whole PBF file. Any decoding error fails the load; no partial store is returned.
	pub fn from_pbf(blob: &Blob) -> Result<EntityStore> {
		Self::from_pbf_with_progress(blob, &mut |_| {})
	}

	/// Like [`EntityStore::from_pbf`], reporting a message after every decoded block.
	pub fn from_pbf_with_progress(blob: &Blob, progress: &mut dyn FnMut(String)) -> Result<EntityStore> {
		let reader = PbfReader::new(blob.as_slice()).context("Failed to open PBF data")?;
		let mut store = EntityStore::new(reader.header().clone());

		for (index, block) in reader.enumerate() {
			let block = block?;
			store.nodes.reserve(block.nodes.len());
			for node in block.nodes {
				store.insert(OsmEntity::Node(node))?;
			}
			for way in block.ways {
				store.insert(OsmEntity::Way(way))?;
			}
			for relation in block.relations {
				store.insert(OsmEntity::Relation(relation))?;
			}
			let stats = store.stats();
			progress(format!(
				"block {index}: {} nodes, {} ways, {} relations",
				stats.nodes, stats.ways, stats.relations
			));
		}

		store.revalidate();
		let stats = store.stats();
		info!(
			"loaded {} nodes, {} ways and {} relations",
			stats.nodes, stats.ways, stats.relations
		);
		store.report.log();
		Ok(store)
	}

	/// Encodes the store as a PBF file: nodes, then ways, then relations, in insertion order.
	pub fn to_pbf(&self) -> Result<Blob> {
		let mut header = self.header.clone();
		header.bbox = self.bbox_all().or(header.bbox);

		let mut writer = PbfWriter::new(&header)?;
		for (_, node) in self.nodes.iter() {
			writer.add_node(node.clone())?;
		}
		for (_, way) in self.ways.iter() {
			writer.add_way(way.clone())?;
		}
		for (_, relation) in self.relations.iter() {
			writer.add_relation(relation.clone())?;
		}
		writer.finish().context("Failed to encode PBF data")
	}

	#[must_use]
	pub fn header(&self) -> &OsmHeader {
		&self.header
	}

	/// Increases with every mutation.
	#[must_use]
	pub fn generation(&self) -> u64 {
		self.generation
	}

	#[must_use]
	pub fn stats(&self) -> StoreStats {
		StoreStats {
			nodes: self.nodes.len(),
			ways: self.ways.len(),
			relations: self.relations.len(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.stats().total() == 0
	}

	fn insert(&mut self, entity: OsmEntity) -> Result<EntityRef> {
		let (kind, id) = (entity.kind(), entity.id());
		let keys: Vec<String> = entity.tags().keys().map(str::to_string).collect();
		let index = match entity {
			OsmEntity::Node(node) => self.nodes.insert(node),
			OsmEntity::Way(way) => self.ways.insert(way),
			OsmEntity::Relation(relation) => self.relations.insert(relation),
		}
		.ok_or(OsmixError::EntityExists { kind, id })?;

		let entity_ref = EntityRef::new(kind, index);
		for key in keys {
			self.tag_index.add(key, entity_ref);
		}
		self.generation += 1;
		Ok(entity_ref)
	}

	fn replace(&mut self, entity: OsmEntity) -> Result<EntityRef> {
		let (kind, id) = (entity.kind(), entity.id());
		let tags = entity.tags().clone();
		let (index, previous_tags) = match entity {
			OsmEntity::Node(node) => self.nodes.replace(node).map(|(i, p)| (i, p.tags)),
			OsmEntity::Way(way) => self.ways.replace(way).map(|(i, p)| (i, p.tags)),
			OsmEntity::Relation(relation) => self.relations.replace(relation).map(|(i, p)| (i, p.tags)),
		}
		.ok_or_else(|| not_found(kind, id))?;

		let entity_ref = EntityRef::new(kind, index);
		// stale index entries are filtered on lookup, only new keys need an entry
		for key in tags.keys().filter(|key| !previous_tags.contains_key(key)) {
			self.tag_index.add(key.to_string(), entity_ref);
		}
		self.generation += 1;
		Ok(entity_ref)
	}

	fn remove(&mut self, kind: EntityKind, id: i64) -> Result<OsmEntity> {
		let entity = match kind {
			EntityKind::Node => self.nodes.remove(id).map(|(_, e)| OsmEntity::Node(e)),
			EntityKind::Way => self.ways.remove(id).map(|(_, e)| OsmEntity::Way(e)),
			EntityKind::Relation => self.relations.remove(id).map(|(_, e)| OsmEntity::Relation(e)),
		}
		.ok_or_else(|| not_found(kind, id))?;
		self.generation += 1;
		Ok(entity)
	}

	/// Adds an entity whose id is not yet used by its kind.
	pub fn create(&mut self, entity: impl Into<OsmEntity>) -> Result<EntityRef> {
		let entity_ref = self.insert(entity.into())?;
		self.revalidate();
		Ok(entity_ref)
	}

	/// Replaces the entity with the same kind and id.
	pub fn modify(&mut self, entity: impl Into<OsmEntity>) -> Result<EntityRef> {
		let entity_ref = self.replace(entity.into())?;
		self.revalidate();
		Ok(entity_ref)
	}

	/// Removes an entity and returns it. Ways and relations referencing it become incomplete.
	pub fn delete(&mut self, kind: EntityKind, id: i64) -> Result<OsmEntity> {
		let entity = self.remove(kind, id)?;
		debug!("deleted {kind} {id}");
		self.revalidate();
		Ok(entity)
	}

	/// Applies a changeset, kind by kind. Stops at the first change that does not apply.
	pub fn apply_changes(&mut self, changes: &OsmChanges) -> Result<()> {
		fn apply<T: Element + Into<OsmEntity>>(store: &mut EntityStore, change: &OsmChange<T>) -> Result<()> {
			let id = change.entity.id();
			match change.change_type {
				ChangeType::Create => store.insert(change.entity.clone().into()).map(|_| ()),
				ChangeType::Modify => store.replace(change.entity.clone().into()).map(|_| ()),
				ChangeType::Delete => store.remove(T::KIND, id).map(|_| ()),
			}
			.with_context(|| format!("Failed to apply {:?} of {} {id}", change.change_type, T::KIND))
		}

		for change in changes.nodes.values() {
			apply(self, change)?;
		}
		for change in changes.ways.values() {
			apply(self, change)?;
		}
		for change in changes.relations.values() {
			apply(self, change)?;
		}
		self.revalidate();
		debug!("applied {} changes", changes.len());
		Ok(())
	}

	pub fn get_by_id(&self, kind: EntityKind, id: i64) -> Result<OsmEntity> {
		match kind {
			EntityKind::Node => self.node(id).cloned().map(OsmEntity::Node),
			EntityKind::Way => self.way(id).cloned().map(OsmEntity::Way),
			EntityKind::Relation => self.relation(id).cloned().map(OsmEntity::Relation),
		}
		.ok_or_else(|| not_found(kind, id))
	}

	#[must_use]
	pub fn contains(&self, kind: EntityKind, id: i64) -> bool {
		match kind {
			EntityKind::Node => self.nodes.contains(id),
			EntityKind::Way => self.ways.contains(id),
			EntityKind::Relation => self.relations.contains(id),
		}
	}

	#[must_use]
	pub fn node(&self, id: i64) -> Option<&OsmNode> {
		self.nodes.get(id)
	}

	#[must_use]
	pub fn way(&self, id: i64) -> Option<&OsmWay> {
		self.ways.get(id)
	}

	#[must_use]
	pub fn relation(&self, id: i64) -> Option<&OsmRelation> {
		self.relations.get(id)
	}

	#[must_use]
	pub fn node_at(&self, index: usize) -> Option<&OsmNode> {
		self.nodes.at(index)
	}

	#[must_use]
	pub fn way_at(&self, index: usize) -> Option<&OsmWay> {
		self.ways.at(index)
	}

	#[must_use]
	pub fn relation_at(&self, index: usize) -> Option<&OsmRelation> {
		self.relations.at(index)
	}

	/// The handle of an entity.
	#[must_use]
	pub fn entity_ref(&self, kind: EntityKind, id: i64) -> Option<EntityRef> {
		let index = match kind {
			EntityKind::Node => self.nodes.index_of(id),
			EntityKind::Way => self.ways.index_of(id),
			EntityKind::Relation => self.relations.index_of(id),
		}?;
		Some(EntityRef::new(kind, index))
	}

	/// Resolves a handle into an owned entity.
	#[must_use]
	pub fn resolve(&self, entity_ref: EntityRef) -> Option<OsmEntity> {
		Some(match entity_ref.kind {
			EntityKind::Node => OsmEntity::Node(self.nodes.at(entity_ref.index)?.clone()),
			EntityKind::Way => OsmEntity::Way(self.ways.at(entity_ref.index)?.clone()),
			EntityKind::Relation => OsmEntity::Relation(self.relations.at(entity_ref.index)?.clone()),
		})
	}

	#[must_use]
	pub fn id_of(&self, entity_ref: EntityRef) -> Option<i64> {
		Some(match entity_ref.kind {
			EntityKind::Node => self.nodes.at(entity_ref.index)?.id,
			EntityKind::Way => self.ways.at(entity_ref.index)?.id,
			EntityKind::Relation => self.relations.at(entity_ref.index)?.id,
		})
	}

	#[must_use]
	pub fn tags_of(&self, entity_ref: EntityRef) -> Option<&Tags> {
		Some(match entity_ref.kind {
			EntityKind::Node => &self.nodes.at(entity_ref.index)?.tags,
			EntityKind::Way => &self.ways.at(entity_ref.index)?.tags,
			EntityKind::Relation => &self.relations.at(entity_ref.index)?.tags,
		})
	}

	/// Live nodes in insertion order.
	pub fn nodes(&self) -> impl Iterator<Item = (EntityRef, &OsmNode)> {
		self.nodes.iter().map(|(i, n)| (EntityRef::new(EntityKind::Node, i), n))
	}

	pub fn ways(&self) -> impl Iterator<Item = (EntityRef, &OsmWay)> {
		self.ways.iter().map(|(i, w)| (EntityRef::new(EntityKind::Way, i), w))
	}

	pub fn relations(&self) -> impl Iterator<Item = (EntityRef, &OsmRelation)> {
		self
			.relations
			.iter()
			.map(|(i, r)| (EntityRef::new(EntityKind::Relation, i), r))
	}

	/// Entities tagged `key` (any value) or `key=value`, nodes first, then ways, then
	/// relations, each in insertion order.
	#[must_use]
	pub fn search(&self, key: &str, value: Option<&str>) -> Vec<EntityRef> {
		let mut refs: Vec<EntityRef> = self
			.tag_index
			.get(key)
			.iter()
			.copied()
			.filter(|entity_ref| self.tags_of(*entity_ref).is_some_and(|tags| tags.matches(key, value)))
			.collect();
		refs.sort_unstable();
		refs.dedup();
		refs
	}

	/// [`EntityStore::search`] restricted to one kind.
	#[must_use]
	pub fn search_kind(&self, kind: EntityKind, key: &str, value: Option<&str>) -> Vec<EntityRef> {
		let mut refs = self.search(key, value);
		refs.retain(|entity_ref| entity_ref.kind == kind);
		refs
	}

	/// Coordinates of the resolvable nodes of `way`, in order.
	#[must_use]
	pub fn way_coordinates(&self, way: &OsmWay) -> Vec<[f64; 2]> {
		way.refs.iter().filter_map(|id| Some(self.node(*id)?.position())).collect()
	}

	/// Bounding box of an entity. `None` if none of its referenced nodes resolve.
	pub fn bbox(&self, kind: EntityKind, id: i64) -> Result<Option<GeoBBox>> {
		let entity_ref = self.entity_ref(kind, id).ok_or_else(|| not_found(kind, id))?;
		Ok(self.bbox_of(entity_ref))
	}

	#[must_use]
	pub fn bbox_of(&self, entity_ref: EntityRef) -> Option<GeoBBox> {
		match entity_ref.kind {
			EntityKind::Node => {
				let node = self.nodes.at(entity_ref.index)?;
				Some(GeoBBox::from_point(node.lon(), node.lat()))
			}
			EntityKind::Way => self.way_bbox(self.ways.at(entity_ref.index)?),
			EntityKind::Relation => self.relation_bbox(self.relations.at(entity_ref.index)?, &mut HashSet::new()),
		}
	}

	fn way_bbox(&self, way: &OsmWay) -> Option<GeoBBox> {
		let mut bbox = None;
		for [lon, lat] in self.way_coordinates(way) {
			merge_bbox(&mut bbox, GeoBBox::from_point(lon, lat));
		}
		bbox
	}

	fn relation_bbox(&self, relation: &OsmRelation, visited: &mut HashSet<i64>) -> Option<GeoBBox> {
		if !visited.insert(relation.id) {
			return None;
		}
		let mut bbox = None;
		for member in &relation.members {
			let member_bbox = match member.kind {
				EntityKind::Node => self
					.node(member.ref_id)
					.map(|node| GeoBBox::from_point(node.lon(), node.lat())),
				EntityKind::Way => self.way(member.ref_id).and_then(|way| self.way_bbox(way)),
				EntityKind::Relation => self
					.relation(member.ref_id)
					.and_then(|child| self.relation_bbox(child, visited)),
			};
			if let Some(member_bbox) = member_bbox {
				merge_bbox(&mut bbox, member_bbox);
			}
		}
		bbox
	}

	/// Bounding box of all nodes.
	#[must_use]
	pub fn bbox_all(&self) -> Option<GeoBBox> {
		let mut bbox: Option<GeoBBox> = None;
		for (_, node) in self.nodes() {
			merge_bbox(&mut bbox, GeoBBox::from_point(node.lon(), node.lat()));
		}
		bbox
	}

	/// Finds ways and relations with references that do not resolve.
	#[must_use]
	pub fn validate(&self) -> ValidationReport {
		let mut report = ValidationReport::default();
		for (_, way) in self.ways() {
			let missing: Vec<(EntityKind, i64)> = way
				.refs
				.iter()
				.filter(|id| !self.nodes.contains(**id))
				.map(|id| (EntityKind::Node, *id))
				.collect();
			if !missing.is_empty() {
				report.push(ValidationIssue {
					kind: EntityKind::Way,
					id: way.id,
					missing,
				});
			}
		}
		for (_, relation) in self.relations() {
			let missing: Vec<(EntityKind, i64)> = relation
				.members
				.iter()
				.filter(|member| !self.contains(member.kind, member.ref_id))
				.map(|member| (member.kind, member.ref_id))
				.collect();
			if !missing.is_empty() {
				report.push(ValidationIssue {
					kind: EntityKind::Relation,
					id: relation.id,
					missing,
				});
			}
		}
		report
	}

	fn revalidate(&mut self) {
		self.report = self.validate();
	}

	/// The report of the last load or edit.
	#[must_use]
	pub fn validation(&self) -> &ValidationReport {
		&self.report
	}

	/// True if the entity references members missing from this store.
	#[must_use]
	pub fn incomplete(&self, kind: EntityKind, id: i64) -> bool {
		self.report.is_incomplete(kind, id)
	}
}
