//! File block framing.
//!
//! Each file block is a 4 byte big-endian length, a `BlobHeader` message of that length, and
//! a `Blob` message of `BlobHeader.datasize` bytes holding the (usually zlib compressed)
//! payload.

use anyhow::{Context, Result, bail, ensure};
use byteorder::BigEndian;
use osmix_core::{
	Blob,
	compression::{compress_zlib, decompress_zlib},
	io::*,
};

/// Upper bound of a serialized `BlobHeader`.
pub const MAX_BLOB_HEADER_SIZE: u64 = 64 * 1024;
/// Upper bound of a `Blob`, compressed or not.
pub const MAX_BLOB_SIZE: u64 = 32 * 1024 * 1024;

pub const BLOB_TYPE_HEADER: &str = "OSMHeader";
pub const BLOB_TYPE_DATA: &str = "OSMData";

/// A decoded file block: its type and the uncompressed payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
	pub blob_type: String,
	pub data: Blob,
}

/// Reads the frame starting at `position` and returns it with the number of bytes consumed.
pub fn read_frame(data: &[u8], position: usize) -> Result<(Frame, usize)> {
	let available = (data.len() - position) as u64;
	ensure!(
		available >= 4,
		"truncated frame at byte {position}: {available} bytes left for the BlobHeader length"
	);
	let header_size = u64::from(ValueReaderSlice::new_be(&data[position..position + 4]).read_u32()?);
	ensure!(
		header_size <= MAX_BLOB_HEADER_SIZE,
		"BlobHeader of {header_size} bytes exceeds the limit of {MAX_BLOB_HEADER_SIZE}"
	);
	ensure!(
		header_size <= available - 4,
		"BlobHeader declares {header_size} bytes, but only {} remain",
		available - 4
	);

	let header_start = position + 4;
	let header_end = header_start + header_size as usize;
	let (blob_type, data_size) =
		read_blob_header(&data[header_start..header_end]).context("Failed to read BlobHeader")?;
	ensure!(
		data_size <= MAX_BLOB_SIZE,
		"Blob of {data_size} bytes exceeds the limit of {MAX_BLOB_SIZE}"
	);
	ensure!(
		data_size <= (data.len() - header_end) as u64,
		"Blob declares {data_size} bytes, but only {} remain",
		data.len() - header_end
	);

	let blob_end = header_end + data_size as usize;
	let payload = read_blob(&data[header_end..blob_end]).with_context(|| format!("Failed to read {blob_type} blob"))?;

	Ok((
		Frame {
			blob_type,
			data: payload,
		},
		blob_end - position,
	))
}

fn read_blob_header(data: &[u8]) -> Result<(String, u64)> {
	let mut reader = ValueReaderSlice::new_le(data);
	let mut blob_type = None;
	let mut data_size = None;
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_LEN) => blob_type = Some(reader.read_pbf_string().context("Failed to read blob type")?),
			(3, WIRE_VARINT) => data_size = Some(reader.read_varint().context("Failed to read datasize")?),
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}
	Ok((
		blob_type.context("BlobHeader has no type")?,
		data_size.context("BlobHeader has no datasize")?,
	))
}

fn read_blob(data: &[u8]) -> Result<Blob> {
	let mut reader = ValueReaderSlice::new_le(data);
	let mut raw = None;
	let mut zlib = None;
	let mut raw_size = None;
	while reader.has_remaining() {
		match reader.read_pbf_key()? {
			(1, WIRE_LEN) => raw = Some(reader.read_pbf_blob()?),
			(2, WIRE_VARINT) => raw_size = Some(reader.read_varint()?),
			(3, WIRE_LEN) => zlib = Some(reader.read_pbf_blob()?),
			(4, _) => bail!("unsupported compression: lzma"),
			(5, _) => bail!("unsupported compression: bzip2"),
			(6, _) => bail!("unsupported compression: lz4"),
			(7, _) => bail!("unsupported compression: zstd"),
			(_, w) => reader.skip_pbf_field(w)?,
		}
	}

	let payload = match (raw, zlib) {
		(Some(raw), _) => raw,
		(None, Some(zlib)) => decompress_zlib(&zlib, raw_size.unwrap_or(MAX_BLOB_SIZE).min(MAX_BLOB_SIZE))
			.context("Failed to decompress blob")?,
		(None, None) => bail!("Blob carries no data"),
	};
	if let Some(raw_size) = raw_size {
		ensure!(
			payload.len() == raw_size,
			"Blob declares raw_size {raw_size}, but holds {} bytes",
			payload.len()
		);
	}
	Ok(payload)
}

/// Appends a zlib compressed frame holding `payload` to `writer`.
pub fn write_frame(writer: &mut ValueWriterBlob<BigEndian>, blob_type: &str, payload: &Blob) -> Result<()> {
	let mut blob = ValueWriterBlob::new_le();
	blob.write_pbf_varint_field(2, payload.len())?;
	blob.write_pbf_key(3, WIRE_LEN)?;
	blob.write_pbf_blob(&compress_zlib(payload)?)?;
	let blob = blob.into_blob();

	let mut header = ValueWriterBlob::new_le();
	header.write_pbf_key(1, WIRE_LEN)?;
	header.write_pbf_string(blob_type)?;
	header.write_pbf_varint_field(3, blob.len())?;
	let header = header.into_blob();

	writer.write_u32(header.len() as u32)?;
	writer.write_blob(&header)?;
	writer.write_blob(&blob)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn framed(payload: &Blob) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_be();
		write_frame(&mut writer, BLOB_TYPE_DATA, payload)?;
		Ok(writer.into_blob())
	}

	#[test]
	fn frame_round_trip() -> Result<()> {
		let payload = Blob::from("some primitive block");
		let data = framed(&payload)?;
		let (frame, consumed) = read_frame(data.as_slice(), 0)?;
		assert_eq!(consumed as u64, data.len());
		assert_eq!(frame.blob_type, BLOB_TYPE_DATA);
		assert_eq!(frame.data, payload);
		Ok(())
	}

	#[test]
	fn truncated_blob() -> Result<()> {
		let data = framed(&Blob::from("payload"))?;
		let short = &data.as_slice()[..data.len() as usize - 1];
		let error = read_frame(short, 0).unwrap_err();
		assert!(error.to_string().contains("only"), "{error}");
		Ok(())
	}

	#[test]
	fn oversized_header() {
		let data = [0x00, 0x01, 0x00, 0x01, 0x00];
		assert!(read_frame(&data, 0).is_err());
	}

	#[test]
	fn raw_blob() -> Result<()> {
		// Blob { raw: "abc" }
		assert_eq!(read_blob(&[0x0A, 0x03, b'a', b'b', b'c'])?, Blob::from("abc"));
		Ok(())
	}

	#[test]
	fn unsupported_compression() {
		// Blob { zstd_data: "x" }
		let error = read_blob(&[0x3A, 0x01, b'x']).unwrap_err();
		assert_eq!(error.to_string(), "unsupported compression: zstd");
	}
}
