//! The `ValueWriter` trait, the encoding counterpart of [`ValueReader`](super::ValueReader).
//!
//! ```rust
//! use osmix_core::io::{ValueWriter, ValueWriterBlob};
//!
//! let mut writer = ValueWriterBlob::new_le();
//! writer.write_pbf_key(1, 0).unwrap();
//! writer.write_varint(150).unwrap();
//! assert_eq!(writer.into_blob().into_vec(), vec![0x08, 0x96, 0x01]);
//! ```

use super::ValueWriterBlob;
use crate::Blob;
use anyhow::{Context, Result};
use byteorder::{ByteOrder, WriteBytesExt};
use std::io::Write;

pub trait ValueWriter<E: ByteOrder> {
	fn get_writer(&mut self) -> &mut dyn Write;

	fn position(&mut self) -> Result<u64>;

	fn is_empty(&mut self) -> Result<bool> {
		Ok(self.position()? == 0)
	}

	fn write_varint(&mut self, mut value: u64) -> Result<()> {
		while value >= 0x80 {
			self.get_writer().write_all(&[((value & 0x7F) as u8) | 0x80])?;
			value >>= 7;
		}
		self.get_writer().write_all(&[value as u8])?;
		Ok(())
	}

	/// Writes a zigzag encoded varint.
	fn write_svarint(&mut self, value: i64) -> Result<()> {
		self.write_varint(((value << 1) ^ (value >> 63)) as u64)
	}

	fn write_u8(&mut self, value: u8) -> Result<()> {
		Ok(self.get_writer().write_u8(value)?)
	}

	fn write_u32(&mut self, value: u32) -> Result<()> {
		Ok(self.get_writer().write_u32::<E>(value)?)
	}

	fn write_f32(&mut self, value: f32) -> Result<()> {
		Ok(self.get_writer().write_f32::<E>(value)?)
	}

	fn write_f64(&mut self, value: f64) -> Result<()> {
		Ok(self.get_writer().write_f64::<E>(value)?)
	}

	fn write_blob(&mut self, blob: &Blob) -> Result<()> {
		self.get_writer().write_all(blob.as_slice())?;
		Ok(())
	}

	fn write_slice(&mut self, buf: &[u8]) -> Result<()> {
		self.get_writer().write_all(buf)?;
		Ok(())
	}

	fn write_string(&mut self, text: &str) -> Result<()> {
		self.get_writer().write_all(text.as_bytes())?;
		Ok(())
	}

	fn write_pbf_key(&mut self, field_number: u32, wire_type: u8) -> Result<()> {
		self
			.write_varint((u64::from(field_number) << 3) | u64::from(wire_type))
			.context("Failed to write PBF key")
	}

	/// Writes a key followed by a varint value (wire type 0).
	fn write_pbf_varint_field(&mut self, field_number: u32, value: u64) -> Result<()> {
		self.write_pbf_key(field_number, 0)?;
		self.write_varint(value)
	}

	/// Writes a key followed by a zigzag varint value (wire type 0).
	fn write_pbf_svarint_field(&mut self, field_number: u32, value: i64) -> Result<()> {
		self.write_pbf_key(field_number, 0)?;
		self.write_svarint(value)
	}

	fn write_pbf_packed_uint32(&mut self, data: &[u32]) -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		for &value in data {
			writer
				.write_varint(u64::from(value))
				.context("Failed to write varint for packed uint32")?;
		}
		self
			.write_pbf_blob(&writer.into_blob())
			.context("Failed to write packed uint32 blob")
	}

	fn write_pbf_packed_int64(&mut self, data: &[i64]) -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		for &value in data {
			writer.write_varint(value as u64)?;
		}
		self
			.write_pbf_blob(&writer.into_blob())
			.context("Failed to write packed int64 blob")
	}

	fn write_pbf_packed_sint64(&mut self, data: &[i64]) -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		for &value in data {
			writer.write_svarint(value)?;
		}
		self
			.write_pbf_blob(&writer.into_blob())
			.context("Failed to write packed sint64 blob")
	}

	/// Writes absolute values as a packed `sint64` delta sequence.
	fn write_pbf_packed_delta(&mut self, data: &[i64]) -> Result<()> {
		let mut previous = 0i64;
		let deltas: Vec<i64> = data
			.iter()
			.map(|&value| {
				let delta = value.wrapping_sub(previous);
				previous = value;
				delta
			})
			.collect();
		self.write_pbf_packed_sint64(&deltas)
	}

	fn write_pbf_blob(&mut self, blob: &Blob) -> Result<()> {
		self
			.write_varint(blob.len())
			.context("Failed to write varint for blob length")?;
		self.write_blob(blob).context("Failed to write PBF blob")
	}

	fn write_pbf_string(&mut self, text: &str) -> Result<()> {
		self
			.write_varint(text.len() as u64)
			.context("Failed to write varint for string length")?;
		self.write_string(text).context("Failed to write PBF string")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::{ValueReader, ValueReaderSlice};

	#[test]
	fn write_varint() -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_varint(300)?;
		assert_eq!(writer.into_blob().into_vec(), vec![0b1010_1100, 0b0000_0010]);
		Ok(())
	}

	#[test]
	fn write_svarint() -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_svarint(-75)?;
		writer.write_svarint(75)?;
		assert_eq!(writer.into_blob().into_vec(), vec![0x95, 0x01, 0x96, 0x01]);
		Ok(())
	}

	#[test]
	fn write_fields() -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_pbf_varint_field(1, 5)?;
		writer.write_pbf_svarint_field(2, -1)?;
		writer.write_pbf_key(3, 2)?;
		writer.write_pbf_string("ab")?;
		assert_eq!(
			writer.into_blob().into_vec(),
			vec![0x08, 0x05, 0x10, 0x01, 0x1A, 0x02, b'a', b'b']
		);
		Ok(())
	}

	#[test]
	fn packed_delta_is_read_back() -> Result<()> {
		let values = vec![-3, 120_000_000, 119_999_999, 5];
		let mut writer = ValueWriterBlob::new_le();
		writer.write_pbf_packed_delta(&values)?;
		let blob = writer.into_blob();
		let mut reader = ValueReaderSlice::new_le(blob.as_slice());
		assert_eq!(reader.read_pbf_packed_delta()?, values);
		Ok(())
	}

	#[test]
	fn packed_uint32() -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_pbf_packed_uint32(&[100, 150, 300])?;
		assert_eq!(writer.into_blob().into_vec(), vec![0x05, 0x64, 0x96, 0x01, 0xAC, 0x02]);
		Ok(())
	}
}
