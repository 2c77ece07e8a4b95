//! The `HeaderBlock` message of an `OSMHeader` file block.

use crate::OsmHeader;
use anyhow::{Context, Result, ensure};
use byteorder::LE;
use osmix_core::{Blob, GeoBBox, io::*};

/// Required features this reader understands.
pub const SUPPORTED_FEATURES: [&str; 3] = ["OsmSchema-V0.6", "DenseNodes", "HistoricalInformation"];

/// Required features every written file declares.
pub const WRITTEN_FEATURES: [&str; 2] = ["OsmSchema-V0.6", "DenseNodes"];

const NANO: f64 = 1e9;

pub fn decode_header(blob: &Blob) -> Result<OsmHeader> {
	let mut reader = ValueReaderSlice::new_le(blob.as_slice());
	let mut header = OsmHeader::default();
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_LEN) => {
				header.bbox = Some(decode_bbox(reader.get_pbf_sub_reader()?.as_mut()).context("Failed to read header bbox")?);
			}
			(4, WIRE_LEN) => header.required_features.push(reader.read_pbf_string()?),
			(5, WIRE_LEN) => header.optional_features.push(reader.read_pbf_string()?),
			(16, WIRE_LEN) => header.writing_program = Some(reader.read_pbf_string()?),
			(17, WIRE_LEN) => header.source = Some(reader.read_pbf_string()?),
			(32, WIRE_VARINT) => header.replication_timestamp = Some(reader.read_varint()? as i64),
			(33, WIRE_VARINT) => header.replication_sequence_number = Some(reader.read_varint()? as i64),
			(34, WIRE_LEN) => header.replication_base_url = Some(reader.read_pbf_string()?),
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}

	for feature in &header.required_features {
		ensure!(
			SUPPORTED_FEATURES.contains(&feature.as_str()),
			"unsupported required feature '{feature}'"
		);
	}
	Ok(header)
}

fn decode_bbox(reader: &mut dyn ValueReader<'_, LE>) -> Result<GeoBBox> {
	let (mut left, mut right, mut top, mut bottom) = (0, 0, 0, 0);
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_VARINT) => left = reader.read_svarint()?,
			(2, WIRE_VARINT) => right = reader.read_svarint()?,
			(3, WIRE_VARINT) => top = reader.read_svarint()?,
			(4, WIRE_VARINT) => bottom = reader.read_svarint()?,
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}
	GeoBBox::new(
		left as f64 / NANO,
		bottom as f64 / NANO,
		right as f64 / NANO,
		top as f64 / NANO,
	)
}

/// Encodes `header`, declaring [`WRITTEN_FEATURES`] in place of its own required features.
pub fn encode_header(header: &OsmHeader) -> Result<Blob> {
	let mut writer = ValueWriterBlob::new_le();

	if let Some(bbox) = &header.bbox {
		let mut inner = ValueWriterBlob::new_le();
		inner.write_pbf_svarint_field(1, (bbox.x_min * NANO).round() as i64)?;
		inner.write_pbf_svarint_field(2, (bbox.x_max * NANO).round() as i64)?;
		inner.write_pbf_svarint_field(3, (bbox.y_max * NANO).round() as i64)?;
		inner.write_pbf_svarint_field(4, (bbox.y_min * NANO).round() as i64)?;
		writer.write_pbf_key(1, WIRE_LEN)?;
		writer.write_pbf_blob(&inner.into_blob())?;
	}

	for feature in WRITTEN_FEATURES {
		writer.write_pbf_key(4, WIRE_LEN)?;
		writer.write_pbf_string(feature)?;
	}
	for feature in &header.optional_features {
		writer.write_pbf_key(5, WIRE_LEN)?;
		writer.write_pbf_string(feature)?;
	}

	let program = header
		.writing_program
		.clone()
		.unwrap_or_else(|| format!("osmix {}", env!("CARGO_PKG_VERSION")));
	writer.write_pbf_key(16, WIRE_LEN)?;
	writer.write_pbf_string(&program)?;

	if let Some(source) = &header.source {
		writer.write_pbf_key(17, WIRE_LEN)?;
		writer.write_pbf_string(source)?;
	}
	if let Some(timestamp) = header.replication_timestamp {
		writer.write_pbf_varint_field(32, timestamp as u64)?;
	}
	if let Some(sequence_number) = header.replication_sequence_number {
		writer.write_pbf_varint_field(33, sequence_number as u64)?;
	}
	if let Some(url) = &header.replication_base_url {
		writer.write_pbf_key(34, WIRE_LEN)?;
		writer.write_pbf_string(url)?;
	}

	Ok(writer.into_blob())
}
