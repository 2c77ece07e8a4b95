//! Reading and writing OpenStreetMap PBF files.
//!
//! ```rust
//! use osmix_osm::{OsmHeader, OsmNode, pbf::{PbfReader, PbfWriter}};
//!
//! let mut writer = PbfWriter::new(&OsmHeader::default()).unwrap();
//! writer.add_node(OsmNode::new(1, 7.42, 43.73)).unwrap();
//! let blob = writer.finish().unwrap();
//!
//! let reader = PbfReader::new(blob.as_slice()).unwrap();
//! let blocks = reader.collect::<anyhow::Result<Vec<_>>>().unwrap();
//! assert_eq!(blocks[0].nodes[0].id, 1);
//! ```

mod block;
mod frame;
mod header;

pub use block::PrimitiveBlock;
pub use frame::{BLOB_TYPE_DATA, BLOB_TYPE_HEADER, MAX_BLOB_HEADER_SIZE, MAX_BLOB_SIZE};
pub use header::{SUPPORTED_FEATURES, WRITTEN_FEATURES};

use crate::{EntityKind, OsmHeader, OsmNode, OsmRelation, OsmWay, OsmixError};
use anyhow::{Context, Result, ensure};
use byteorder::BigEndian;
use frame::{read_frame, write_frame};
use log::trace;
use osmix_core::{Blob, io::ValueWriterBlob};

/// Entities per written block.
pub const ENTITIES_PER_BLOCK: usize = 8000;

fn parse_error(error: anyhow::Error, message: String) -> anyhow::Error {
	error.context(OsmixError::Parse(message))
}

fn read_header_frame(data: &[u8]) -> Result<(OsmHeader, usize)> {
	let (frame, consumed) = read_frame(data, 0)?;
	ensure!(
		frame.blob_type == BLOB_TYPE_HEADER,
		"expected an {BLOB_TYPE_HEADER} block, found '{}'",
		frame.blob_type
	);
	Ok((header::decode_header(&frame.data)?, consumed))
}

/// Decodes a PBF file block by block.
///
/// The header block is read by [`PbfReader::new`]; iterating yields the decoded
/// [`PrimitiveBlock`]s in file order. The first error ends the iteration. All errors carry
/// [`OsmixError::Parse`].
pub struct PbfReader<'a> {
	data: &'a [u8],
	position: usize,
	block_index: usize,
	header: OsmHeader,
}

impl<'a> PbfReader<'a> {
	pub fn new(data: &'a [u8]) -> Result<PbfReader<'a>> {
		let (header, consumed) =
			read_header_frame(data).map_err(|e| parse_error(e, "Failed to read the header block".into()))?;
		Ok(PbfReader {
			data,
			position: consumed,
			block_index: 0,
			header,
		})
	}

	#[must_use]
	pub fn header(&self) -> &OsmHeader {
		&self.header
	}

	/// Bytes consumed so far.
	#[must_use]
	pub fn position(&self) -> usize {
		self.position
	}

	fn read_next(&mut self) -> Result<Option<PrimitiveBlock>> {
		while self.position < self.data.len() {
			let (frame, consumed) = read_frame(self.data, self.position)?;
			self.position += consumed;
			if frame.blob_type != BLOB_TYPE_DATA {
				trace!("skipping '{}' block", frame.blob_type);
				continue;
			}
			let block = PrimitiveBlock::decode(&frame.data)?;
			trace!(
				"block {}: {} nodes, {} ways, {} relations",
				self.block_index,
				block.nodes.len(),
				block.ways.len(),
				block.relations.len()
			);
			return Ok(Some(block));
		}
		Ok(None)
	}
}

impl Iterator for PbfReader<'_> {
	type Item = Result<PrimitiveBlock>;

	fn next(&mut self) -> Option<Self::Item> {
		match self.read_next() {
			Ok(Some(block)) => {
				self.block_index += 1;
				Some(Ok(block))
			}
			Ok(None) => None,
			Err(error) => {
				let message = format!("Failed to read block {} at byte {}", self.block_index, self.position);
				self.position = self.data.len();
				Some(Err(parse_error(error, message)))
			}
		}
	}
}

/// Encodes entities into a PBF file.
///
/// Entities are buffered into blocks of [`ENTITIES_PER_BLOCK`]; a block only ever holds
/// one entity kind, so adding nodes, then ways, then relations yields the canonical order.
pub struct PbfWriter {
	output: ValueWriterBlob<BigEndian>,
	block: PrimitiveBlock,
	kind: Option<EntityKind>,
	blocks: usize,
}

impl PbfWriter {
	pub fn new(header: &OsmHeader) -> Result<PbfWriter> {
		let mut output = ValueWriterBlob::new_be();
		write_frame(
			&mut output,
			BLOB_TYPE_HEADER,
			&header::encode_header(header).context("Failed to encode header block")?,
		)?;
		Ok(PbfWriter {
			output,
			block: PrimitiveBlock::default(),
			kind: None,
			blocks: 0,
		})
	}

	fn prepare(&mut self, kind: EntityKind) -> Result<()> {
		if self.kind != Some(kind) || self.block.len() >= ENTITIES_PER_BLOCK {
			self.flush()?;
			self.kind = Some(kind);
		}
		Ok(())
	}

	pub fn add_node(&mut self, node: OsmNode) -> Result<()> {
		self.prepare(EntityKind::Node)?;
		self.block.nodes.push(node);
		Ok(())
	}

	pub fn add_way(&mut self, way: OsmWay) -> Result<()> {
		self.prepare(EntityKind::Way)?;
		self.block.ways.push(way);
		Ok(())
	}

	pub fn add_relation(&mut self, relation: OsmRelation) -> Result<()> {
		self.prepare(EntityKind::Relation)?;
		self.block.relations.push(relation);
		Ok(())
	}

	fn flush(&mut self) -> Result<()> {
		if self.block.is_empty() {
			return Ok(());
		}
		let block = std::mem::take(&mut self.block);
		let payload = block
			.encode()
			.with_context(|| format!("Failed to encode block {}", self.blocks))?;
		write_frame(&mut self.output, BLOB_TYPE_DATA, &payload)?;
		self.blocks += 1;
		Ok(())
	}

	/// Flushes the last block and returns the file.
	pub fn finish(mut self) -> Result<Blob> {
		self.flush()?;
		Ok(self.output.into_blob())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{EntityStore, Tags};
	use osmix_core::io::ValueWriter;
	use rstest::rstest;

	fn write(nodes: usize) -> Result<Blob> {
		let mut writer = PbfWriter::new(&OsmHeader::default())?;
		for id in 0..nodes {
			writer.add_node(OsmNode::new(id as i64, 0.001 * id as f64, 0.0))?;
		}
		writer.add_way(OsmWay::new(1, vec![0, 1]).with_tags(Tags::from(vec![("highway", "path")])))?;
		writer.finish()
	}

	#[test]
	fn blocks_are_split() -> Result<()> {
		let blob = write(ENTITIES_PER_BLOCK + 1)?;
		let reader = PbfReader::new(blob.as_slice())?;
		assert_eq!(reader.header().required_features, WRITTEN_FEATURES.to_vec());
		let sizes: Vec<(usize, usize)> = reader
			.map(|block| block.map(|b| (b.nodes.len(), b.ways.len())))
			.collect::<Result<_>>()?;
		assert_eq!(sizes, vec![(ENTITIES_PER_BLOCK, 0), (1, 0), (0, 1)]);
		Ok(())
	}

	#[test]
	fn truncated_file_is_a_parse_error() -> Result<()> {
		let blob = write(10)?;
		let short = &blob.as_slice()[..blob.len() as usize - 3];
		let mut reader = PbfReader::new(short)?;
		let results: Vec<_> = reader.by_ref().collect();
		let error = results.iter().find_map(|r| r.as_ref().err()).expect("an error");
		assert!(matches!(OsmixError::find(error), Some(OsmixError::Parse(_))));
		assert!(reader.next().is_none());
		Ok(())
	}

	/// A file with one node whose block declares `granularity`.
	fn with_granularity(granularity: u64) -> Result<Blob> {
		let mut block = PrimitiveBlock::default();
		block.nodes.push(OsmNode::new(1, 7.26, 43.69));
		let mut payload = ValueWriterBlob::new_le();
		payload.write_blob(&block.encode()?)?;
		payload.write_pbf_varint_field(17, granularity)?;

		let mut output = ValueWriterBlob::new_be();
		write_frame(&mut output, BLOB_TYPE_HEADER, &header::encode_header(&OsmHeader::default())?)?;
		write_frame(&mut output, BLOB_TYPE_DATA, &payload.into_blob())?;
		Ok(output.into_blob())
	}

	#[rstest]
	#[case(1_000_000_000_000, "invalid granularity")]
	#[case(0, "invalid granularity")]
	#[case(i32::MAX as u64, "out of range")]
	fn hostile_granularity_is_a_parse_error(#[case] granularity: u64, #[case] cause: &str) -> Result<()> {
		let blob = with_granularity(granularity)?;
		let error = PbfReader::new(blob.as_slice())?.collect::<Result<Vec<_>>>().unwrap_err();
		assert!(matches!(OsmixError::find(&error), Some(OsmixError::Parse(_))));
		assert!(format!("{error:#}").contains(cause), "{error:#}");

		let error = EntityStore::from_pbf(&blob).unwrap_err();
		assert!(matches!(OsmixError::find(&error), Some(OsmixError::Parse(_))));
		Ok(())
	}

	#[test]
	fn default_granularity_can_be_restated() -> Result<()> {
		let blob = with_granularity(100)?;
		let blocks = PbfReader::new(blob.as_slice())?.collect::<Result<Vec<_>>>()?;
		assert_eq!(blocks[0].nodes, vec![OsmNode::new(1, 7.26, 43.69)]);
		Ok(())
	}

	#[test]
	fn missing_header() {
		let error = PbfReader::new(&[]).err().unwrap();
		assert!(matches!(OsmixError::find(&error), Some(OsmixError::Parse(_))));
	}
}
