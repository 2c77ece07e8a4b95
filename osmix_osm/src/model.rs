//! Entities of the OpenStreetMap data model.
//!
//! Node coordinates are kept as 1e-7 degree fixed-point integers, the precision PBF stores at
//! its default granularity, so a decode followed by an encode is lossless.

use anyhow::{Result, bail};
use osmix_core::GeoBBox;
use std::{
	collections::{BTreeMap, btree_map},
	fmt::{self, Display},
	str::FromStr,
};

/// Scale between degrees and the fixed-point representation.
pub const COORDINATE_SCALE: f64 = 1e7;

/// Converts degrees into 1e-7 fixed-point.
#[must_use]
pub fn to_fixed(degrees: f64) -> i32 {
	(degrees * COORDINATE_SCALE).round() as i32
}

/// Converts 1e-7 fixed-point into degrees.
#[must_use]
pub fn from_fixed(value: i32) -> f64 {
	f64::from(value) / COORDINATE_SCALE
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
	Node,
	Way,
	Relation,
}

impl EntityKind {
	pub const ALL: [EntityKind; 3] = [EntityKind::Node, EntityKind::Way, EntityKind::Relation];

	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			EntityKind::Node => "node",
			EntityKind::Way => "way",
			EntityKind::Relation => "relation",
		}
	}

	/// Member type as encoded in PBF relations.
	#[must_use]
	pub fn as_member_type(&self) -> i64 {
		match self {
			EntityKind::Node => 0,
			EntityKind::Way => 1,
			EntityKind::Relation => 2,
		}
	}

	pub fn from_member_type(value: i64) -> Result<EntityKind> {
		Ok(match value {
			0 => EntityKind::Node,
			1 => EntityKind::Way,
			2 => EntityKind::Relation,
			_ => bail!("unknown relation member type {value}"),
		})
	}
}

impl Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EntityKind {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self> {
		Ok(match s {
			"node" | "n" => EntityKind::Node,
			"way" | "w" => EntityKind::Way,
			"relation" | "r" => EntityKind::Relation,
			_ => bail!("unknown entity kind '{s}'"),
		})
	}
}

/// A tag set. Ordered by key so equal sets compare and print identically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
	#[must_use]
	pub fn new() -> Tags {
		Tags(BTreeMap::new())
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.insert(key.into(), value.into());
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	#[must_use]
	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// True if the tag `key` is present and, when `value` is given, has exactly that value.
	#[must_use]
	pub fn matches(&self, key: &str, value: Option<&str>) -> bool {
		match (self.get(key), value) {
			(Some(_), None) => true,
			(Some(actual), Some(expected)) => actual == expected,
			(None, _) => false,
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
		self.0.iter()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}
}

impl From<Vec<(&str, &str)>> for Tags {
	fn from(value: Vec<(&str, &str)>) -> Self {
		value.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
	}
}

impl FromIterator<(String, String)> for Tags {
	fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
		Tags(BTreeMap::from_iter(iter))
	}
}

impl<'a> IntoIterator for &'a Tags {
	type Item = (&'a String, &'a String);
	type IntoIter = btree_map::Iter<'a, String, String>;
	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OsmNode {
	pub id: i64,
	/// Longitude in 1e-7 degrees.
	pub lon: i32,
	/// Latitude in 1e-7 degrees.
	pub lat: i32,
	pub tags: Tags,
}

impl OsmNode {
	/// Creates an untagged node from degrees.
	#[must_use]
	pub fn new(id: i64, lon: f64, lat: f64) -> OsmNode {
		OsmNode {
			id,
			lon: to_fixed(lon),
			lat: to_fixed(lat),
			tags: Tags::new(),
		}
	}

	#[must_use]
	pub fn with_tags(mut self, tags: Tags) -> Self {
		self.tags = tags;
		self
	}

	#[must_use]
	pub fn lon(&self) -> f64 {
		from_fixed(self.lon)
	}

	#[must_use]
	pub fn lat(&self) -> f64 {
		from_fixed(self.lat)
	}

	/// `[lon, lat]` in degrees.
	#[must_use]
	pub fn position(&self) -> [f64; 2] {
		[self.lon(), self.lat()]
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OsmWay {
	pub id: i64,
	pub refs: Vec<i64>,
	pub tags: Tags,
}

impl OsmWay {
	#[must_use]
	pub fn new(id: i64, refs: Vec<i64>) -> OsmWay {
		OsmWay {
			id,
			refs,
			tags: Tags::new(),
		}
	}

	#[must_use]
	pub fn with_tags(mut self, tags: Tags) -> Self {
		self.tags = tags;
		self
	}

	/// First and last node id are equal.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.refs.len() >= 2 && self.refs.first() == self.refs.last()
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationMember {
	pub kind: EntityKind,
	pub ref_id: i64,
	pub role: String,
}

impl RelationMember {
	#[must_use]
	pub fn new(kind: EntityKind, ref_id: i64, role: &str) -> RelationMember {
		RelationMember {
			kind,
			ref_id,
			role: role.to_string(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OsmRelation {
	pub id: i64,
	pub members: Vec<RelationMember>,
	pub tags: Tags,
}

impl OsmRelation {
	#[must_use]
	pub fn new(id: i64, members: Vec<RelationMember>) -> OsmRelation {
		OsmRelation {
			id,
			members,
			tags: Tags::new(),
		}
	}

	#[must_use]
	pub fn with_tags(mut self, tags: Tags) -> Self {
		self.tags = tags;
		self
	}
}

/// Common accessors of the three entity types.
pub trait Element: Clone + PartialEq {
	const KIND: EntityKind;
	fn id(&self) -> i64;
	fn tags(&self) -> &Tags;
}

impl Element for OsmNode {
	const KIND: EntityKind = EntityKind::Node;
	fn id(&self) -> i64 {
		self.id
	}
	fn tags(&self) -> &Tags {
		&self.tags
	}
}

impl Element for OsmWay {
	const KIND: EntityKind = EntityKind::Way;
	fn id(&self) -> i64 {
		self.id
	}
	fn tags(&self) -> &Tags {
		&self.tags
	}
}

impl Element for OsmRelation {
	const KIND: EntityKind = EntityKind::Relation;
	fn id(&self) -> i64 {
		self.id
	}
	fn tags(&self) -> &Tags {
		&self.tags
	}
}

/// Any of the three entity kinds, owned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OsmEntity {
	Node(OsmNode),
	Way(OsmWay),
	Relation(OsmRelation),
}

impl OsmEntity {
	#[must_use]
	pub fn kind(&self) -> EntityKind {
		match self {
			OsmEntity::Node(_) => EntityKind::Node,
			OsmEntity::Way(_) => EntityKind::Way,
			OsmEntity::Relation(_) => EntityKind::Relation,
		}
	}

	#[must_use]
	pub fn id(&self) -> i64 {
		match self {
			OsmEntity::Node(n) => n.id,
			OsmEntity::Way(w) => w.id,
			OsmEntity::Relation(r) => r.id,
		}
	}

	#[must_use]
	pub fn tags(&self) -> &Tags {
		match self {
			OsmEntity::Node(n) => &n.tags,
			OsmEntity::Way(w) => &w.tags,
			OsmEntity::Relation(r) => &r.tags,
		}
	}
}

impl From<OsmNode> for OsmEntity {
	fn from(value: OsmNode) -> Self {
		OsmEntity::Node(value)
	}
}

impl From<OsmWay> for OsmEntity {
	fn from(value: OsmWay) -> Self {
		OsmEntity::Way(value)
	}
}

impl From<OsmRelation> for OsmEntity {
	fn from(value: OsmRelation) -> Self {
		OsmEntity::Relation(value)
	}
}

/// Dataset-wide metadata from the PBF header block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OsmHeader {
	pub bbox: Option<GeoBBox>,
	pub required_features: Vec<String>,
	pub optional_features: Vec<String>,
	pub writing_program: Option<String>,
	pub source: Option<String>,
	pub replication_timestamp: Option<i64>,
	pub replication_sequence_number: Option<i64>,
	pub replication_base_url: Option<String>,
}
