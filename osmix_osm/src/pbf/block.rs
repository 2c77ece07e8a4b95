//! `PrimitiveBlock`: the payload of an `OSMData` file block.
//!
//! A block holds a string table and primitive groups. Tag keys, tag values and relation
//! roles are indexes into the string table; ids, coordinates and refs of dense nodes and
//! ways are delta coded.

use crate::{EntityKind, OsmNode, OsmRelation, OsmWay, RelationMember, Tags};
use anyhow::{Context, Result, ensure};
use byteorder::LE;
use itertools::Itertools;
use osmix_core::{Blob, io::*};
use std::collections::HashMap;

const DEFAULT_GRANULARITY: i64 = 100;

/// Decoded entities of one block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimitiveBlock {
	pub nodes: Vec<OsmNode>,
	pub ways: Vec<OsmWay>,
	pub relations: Vec<OsmRelation>,
}

/// Per-block decoding parameters.
struct BlockContext {
	strings: Vec<String>,
	granularity: i64,
	lat_offset: i64,
	lon_offset: i64,
}

impl BlockContext {
	fn string(&self, index: u64) -> Result<&str> {
		self
			.strings
			.get(index as usize)
			.map(String::as_str)
			.with_context(|| format!("string table index {index} out of range ({} entries)", self.strings.len()))
	}

	fn tags(&self, keys: &[u32], vals: &[u32]) -> Result<Tags> {
		ensure!(
			keys.len() == vals.len(),
			"{} tag keys, but {} tag values",
			keys.len(),
			vals.len()
		);
		keys
			.iter()
			.zip(vals)
			.map(|(&k, &v)| Ok((self.string(u64::from(k))?.to_string(), self.string(u64::from(v))?.to_string())))
			.collect()
	}

	/// Converts a raw coordinate into 1e-7 degrees.
	fn coordinate(&self, offset: i64, value: i64) -> Result<i32> {
		let nano = self
			.granularity
			.checked_mul(value)
			.and_then(|scaled| scaled.checked_add(offset))
			.with_context(|| format!("coordinate {value} at granularity {} overflows", self.granularity))?;
		let fixed = if nano % 100 == 0 {
			nano / 100
		} else {
			(nano as f64 / 100.0).round() as i64
		};
		i32::try_from(fixed).with_context(|| format!("coordinate {nano} nanodegrees out of range"))
	}

	fn lat(&self, value: i64) -> Result<i32> {
		self.coordinate(self.lat_offset, value)
	}

	fn lon(&self, value: i64) -> Result<i32> {
		self.coordinate(self.lon_offset, value)
	}
}

impl PrimitiveBlock {
	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len() + self.ways.len() + self.relations.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn decode(blob: &Blob) -> Result<PrimitiveBlock> {
		let mut reader = ValueReaderSlice::new_le(blob.as_slice());
		let mut context = BlockContext {
			strings: Vec::new(),
			granularity: DEFAULT_GRANULARITY,
			lat_offset: 0,
			lon_offset: 0,
		};
		let mut groups: Vec<Blob> = Vec::new();

		// groups precede granularity and offsets on the wire, so decode them last
		while reader.has_remaining() {
			match reader.read_pbf_key()? {
				(1, WIRE_LEN) => {
					context.strings = decode_string_table(reader.get_pbf_sub_reader()?.as_mut())
						.context("Failed to read string table")?;
				}
				(2, WIRE_LEN) => groups.push(reader.read_pbf_blob()?),
				(17, WIRE_VARINT) => context.granularity = read_granularity(reader.read_varint()?)?,
				(19, WIRE_VARINT) => context.lat_offset = reader.read_varint()? as i64,
				(20, WIRE_VARINT) => context.lon_offset = reader.read_varint()? as i64,
				(_, w) => reader.skip_pbf_field(w)?,
			}
		}

		let mut block = PrimitiveBlock::default();
		for (index, group) in groups.iter().enumerate() {
			block
				.decode_group(group, &context)
				.with_context(|| format!("Failed to read primitive group {index}"))?;
		}
		Ok(block)
	}

	fn decode_group(&mut self, group: &Blob, context: &BlockContext) -> Result<()> {
		let mut reader = ValueReaderSlice::new_le(group.as_slice());
		while reader.has_remaining() {
			match reader.read_pbf_key()? {
				(1, WIRE_LEN) => self.nodes.push(decode_node(reader.get_pbf_sub_reader()?.as_mut(), context)?),
				(2, WIRE_LEN) => decode_dense(reader.get_pbf_sub_reader()?.as_mut(), context, &mut self.nodes)?,
				(3, WIRE_LEN) => self.ways.push(decode_way(reader.get_pbf_sub_reader()?.as_mut(), context)?),
				(4, WIRE_LEN) => {
					self
						.relations
						.push(decode_relation(reader.get_pbf_sub_reader()?.as_mut(), context)?);
				}
				(_, w) => reader.skip_pbf_field(w)?,
			}
		}
		Ok(())
	}

	/// Encodes the block with its own string table and one group per entity kind.
	pub fn encode(&self) -> Result<Blob> {
		let table = StringTable::build(self);
		let mut writer = ValueWriterBlob::new_le();

		writer.write_pbf_key(1, WIRE_LEN)?;
		writer.write_pbf_blob(&table.encode()?)?;

		if !self.nodes.is_empty() {
			let mut group = ValueWriterBlob::new_le();
			group.write_pbf_key(2, WIRE_LEN)?;
			group.write_pbf_blob(&encode_dense(&self.nodes, &table)?)?;
			writer.write_pbf_key(2, WIRE_LEN)?;
			writer.write_pbf_blob(&group.into_blob())?;
		}

		if !self.ways.is_empty() {
			let mut group = ValueWriterBlob::new_le();
			for way in &self.ways {
				group.write_pbf_key(3, WIRE_LEN)?;
				group.write_pbf_blob(&encode_way(way, &table)?)?;
			}
			writer.write_pbf_key(2, WIRE_LEN)?;
			writer.write_pbf_blob(&group.into_blob())?;
		}

		if !self.relations.is_empty() {
			let mut group = ValueWriterBlob::new_le();
			for relation in &self.relations {
				group.write_pbf_key(4, WIRE_LEN)?;
				group.write_pbf_blob(&encode_relation(relation, &table)?)?;
			}
			writer.write_pbf_key(2, WIRE_LEN)?;
			writer.write_pbf_blob(&group.into_blob())?;
		}

		Ok(writer.into_blob())
	}
}

/// Granularity is an int32 of nanodegrees per unit and must be positive.
fn read_granularity(raw: u64) -> Result<i64> {
	let granularity = i32::try_from(raw as i64).ok().filter(|&g| g > 0);
	granularity
		.map(i64::from)
		.with_context(|| format!("invalid granularity {}", raw as i64))
}

fn decode_string_table(reader: &mut dyn ValueReader<'_, LE>) -> Result<Vec<String>> {
	let mut strings = Vec::new();
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_LEN) => strings.push(reader.read_pbf_string()?),
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}
	Ok(strings)
}

fn decode_node(reader: &mut dyn ValueReader<'_, LE>, context: &BlockContext) -> Result<OsmNode> {
	let (mut id, mut lat, mut lon) = (0, 0, 0);
	let (mut keys, mut vals) = (Vec::new(), Vec::new());
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_VARINT) => id = reader.read_svarint()?,
			(2, WIRE_LEN) => keys = reader.read_pbf_packed_uint32()?,
			(3, WIRE_LEN) => vals = reader.read_pbf_packed_uint32()?,
			(8, WIRE_VARINT) => lat = reader.read_svarint()?,
			(9, WIRE_VARINT) => lon = reader.read_svarint()?,
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}
	Ok(OsmNode {
		id,
		lon: context.lon(lon)?,
		lat: context.lat(lat)?,
		tags: context.tags(&keys, &vals).with_context(|| format!("Failed to read tags of node {id}"))?,
	})
}

fn decode_dense(
	reader: &mut dyn ValueReader<'_, LE>,
	context: &BlockContext,
	nodes: &mut Vec<OsmNode>,
) -> Result<()> {
	let (mut ids, mut lats, mut lons, mut keys_vals) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_LEN) => ids = reader.read_pbf_packed_delta()?,
			(8, WIRE_LEN) => lats = reader.read_pbf_packed_delta()?,
			(9, WIRE_LEN) => lons = reader.read_pbf_packed_delta()?,
			(10, WIRE_LEN) => keys_vals = reader.read_pbf_packed_uint32()?,
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}
	ensure!(
		ids.len() == lats.len() && ids.len() == lons.len(),
		"dense nodes have {} ids, {} lats and {} lons",
		ids.len(),
		lats.len(),
		lons.len()
	);

	nodes.reserve(ids.len());
	let mut keys_vals = keys_vals.into_iter();
	for ((id, lat), lon) in ids.into_iter().zip(lats).zip(lons) {
		let mut tags = Tags::new();
		// each node's pairs end with a 0; a missing tail means no tags
		while let Some(key) = keys_vals.next().filter(|&key| key != 0) {
			let value = keys_vals
				.next()
				.with_context(|| format!("dense node {id} has a tag key without value"))?;
			tags.insert(context.string(u64::from(key))?, context.string(u64::from(value))?);
		}
		nodes.push(OsmNode {
			id,
			lon: context.lon(lon)?,
			lat: context.lat(lat)?,
			tags,
		});
	}
	Ok(())
}

fn decode_way(reader: &mut dyn ValueReader<'_, LE>, context: &BlockContext) -> Result<OsmWay> {
	let mut id = 0;
	let (mut keys, mut vals, mut refs) = (Vec::new(), Vec::new(), Vec::new());
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_VARINT) => id = reader.read_varint()? as i64,
			(2, WIRE_LEN) => keys = reader.read_pbf_packed_uint32()?,
			(3, WIRE_LEN) => vals = reader.read_pbf_packed_uint32()?,
			(8, WIRE_LEN) => refs = reader.read_pbf_packed_delta()?,
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}
	Ok(OsmWay {
		id,
		refs,
		tags: context.tags(&keys, &vals).with_context(|| format!("Failed to read tags of way {id}"))?,
	})
}

fn decode_relation(reader: &mut dyn ValueReader<'_, LE>, context: &BlockContext) -> Result<OsmRelation> {
	let mut id = 0;
	let (mut keys, mut vals) = (Vec::new(), Vec::new());
	let (mut roles, mut member_ids, mut types) = (Vec::new(), Vec::new(), Vec::new());
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_VARINT) => id = reader.read_varint()? as i64,
			(2, WIRE_LEN) => keys = reader.read_pbf_packed_uint32()?,
			(3, WIRE_LEN) => vals = reader.read_pbf_packed_uint32()?,
			(8, WIRE_LEN) => roles = reader.read_pbf_packed_int64()?,
			(9, WIRE_LEN) => member_ids = reader.read_pbf_packed_delta()?,
			(10, WIRE_LEN) => types = reader.read_pbf_packed_int64()?,
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}
	ensure!(
		roles.len() == member_ids.len() && roles.len() == types.len(),
		"relation {id} has {} roles, {} member ids and {} member types",
		roles.len(),
		member_ids.len(),
		types.len()
	);

	let members = member_ids
		.into_iter()
		.zip(types)
		.zip(roles)
		.map(|((ref_id, kind), role)| {
			Ok(RelationMember {
				kind: EntityKind::from_member_type(kind)?,
				ref_id,
				role: context.string(role as u64)?.to_string(),
			})
		})
		.collect::<Result<Vec<_>>>()
		.with_context(|| format!("Failed to read members of relation {id}"))?;

	Ok(OsmRelation {
		id,
		members,
		tags: context.tags(&keys, &vals).with_context(|| format!("Failed to read tags of relation {id}"))?,
	})
}

/// String table of a block being written. Index 0 is the empty string, the rest are ordered
/// by descending frequency so the most common strings get the shortest varints.
struct StringTable<'a> {
	strings: Vec<&'a str>,
	indexes: HashMap<&'a str, u32>,
}

impl<'a> StringTable<'a> {
	fn build(block: &'a PrimitiveBlock) -> StringTable<'a> {
		let mut counts: HashMap<&'a str, usize> = HashMap::new();
		let tags = block
			.nodes
			.iter()
			.map(|n| &n.tags)
			.chain(block.ways.iter().map(|w| &w.tags))
			.chain(block.relations.iter().map(|r| &r.tags));
		for (key, value) in tags.flat_map(|tags| tags.iter()) {
			*counts.entry(key.as_str()).or_default() += 1;
			*counts.entry(value.as_str()).or_default() += 1;
		}
		for member in block.relations.iter().flat_map(|r| &r.members) {
			*counts.entry(member.role.as_str()).or_default() += 1;
		}
		counts.remove("");

		let mut strings = vec![""];
		strings.extend(
			counts
				.into_iter()
				.sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
				.map(|(string, _)| string),
		);
		let indexes = strings.iter().enumerate().map(|(i, &s)| (s, i as u32)).collect();
		StringTable { strings, indexes }
	}

	fn index(&self, string: &str) -> u32 {
		self.indexes.get(string).copied().unwrap_or(0)
	}

	fn tag_indexes(&self, tags: &Tags) -> (Vec<u32>, Vec<u32>) {
		tags.iter().map(|(k, v)| (self.index(k), self.index(v))).unzip()
	}

	fn encode(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();
		for string in &self.strings {
			writer.write_pbf_key(1, WIRE_LEN)?;
			writer.write_pbf_string(string)?;
		}
		Ok(writer.into_blob())
	}
}

fn encode_dense(nodes: &[OsmNode], table: &StringTable) -> Result<Blob> {
	let ids: Vec<i64> = nodes.iter().map(|n| n.id).collect();
	let lats: Vec<i64> = nodes.iter().map(|n| i64::from(n.lat)).collect();
	let lons: Vec<i64> = nodes.iter().map(|n| i64::from(n.lon)).collect();

	let mut writer = ValueWriterBlob::new_le();
	writer.write_pbf_key(1, WIRE_LEN)?;
	writer.write_pbf_packed_delta(&ids)?;
	writer.write_pbf_key(8, WIRE_LEN)?;
	writer.write_pbf_packed_delta(&lats)?;
	writer.write_pbf_key(9, WIRE_LEN)?;
	writer.write_pbf_packed_delta(&lons)?;

	if nodes.iter().any(|n| !n.tags.is_empty()) {
		let mut keys_vals = Vec::new();
		for node in nodes {
			for (key, value) in &node.tags {
				keys_vals.push(table.index(key));
				keys_vals.push(table.index(value));
			}
			keys_vals.push(0);
		}
		writer.write_pbf_key(10, WIRE_LEN)?;
		writer.write_pbf_packed_uint32(&keys_vals)?;
	}
	Ok(writer.into_blob())
}

fn write_tags(writer: &mut ValueWriterBlob<LE>, tags: &Tags, table: &StringTable) -> Result<()> {
	if tags.is_empty() {
		return Ok(());
	}
	let (keys, vals) = table.tag_indexes(tags);
	writer.write_pbf_key(2, WIRE_LEN)?;
	writer.write_pbf_packed_uint32(&keys)?;
	writer.write_pbf_key(3, WIRE_LEN)?;
	writer.write_pbf_packed_uint32(&vals)
}

fn encode_way(way: &OsmWay, table: &StringTable) -> Result<Blob> {
	let mut writer = ValueWriterBlob::new_le();
	writer.write_pbf_varint_field(1, way.id as u64)?;
	write_tags(&mut writer, &way.tags, table)?;
	if !way.refs.is_empty() {
		writer.write_pbf_key(8, WIRE_LEN)?;
		writer.write_pbf_packed_delta(&way.refs)?;
	}
	Ok(writer.into_blob())
}

fn encode_relation(relation: &OsmRelation, table: &StringTable) -> Result<Blob> {
	let mut writer = ValueWriterBlob::new_le();
	writer.write_pbf_varint_field(1, relation.id as u64)?;
	write_tags(&mut writer, &relation.tags, table)?;
	if !relation.members.is_empty() {
		let roles: Vec<i64> = relation
			.members
			.iter()
			.map(|m| i64::from(table.index(&m.role)))
			.collect();
		let ids: Vec<i64> = relation.members.iter().map(|m| m.ref_id).collect();
		let types: Vec<i64> = relation.members.iter().map(|m| m.kind.as_member_type()).collect();
		writer.write_pbf_key(8, WIRE_LEN)?;
		writer.write_pbf_packed_int64(&roles)?;
		writer.write_pbf_key(9, WIRE_LEN)?;
		writer.write_pbf_packed_delta(&ids)?;
		writer.write_pbf_key(10, WIRE_LEN)?;
		writer.write_pbf_packed_int64(&types)?;
	}
	Ok(writer.into_blob())
}
