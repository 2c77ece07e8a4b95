//! The `ValueReader` trait: protobuf-aware reading of scalars, varints and nested messages.
//!
//! Both PBF (OpenStreetMap) and MVT (vector tiles) are protobuf encodings, so every decoder in
//! this workspace walks a message through this trait: read a key, dispatch on the field number,
//! and either decode the value or skip it by wire type.
//!
//! ```rust
//! use osmix_core::io::{ValueReader, ValueReaderSlice};
//!
//! let mut reader = ValueReaderSlice::new_le(&[0x08, 0x96, 0x01]);
//! assert_eq!(reader.read_pbf_key().unwrap(), (1, 0));
//! assert_eq!(reader.read_varint().unwrap(), 150);
//! ```

use crate::Blob;
use anyhow::{Context, Result, bail, ensure};
use byteorder::{ByteOrder, ReadBytesExt};
use std::io::{Read, Seek};

/// Protobuf wire type of a varint field.
pub const WIRE_VARINT: u8 = 0;
/// Protobuf wire type of a fixed 64 bit field.
pub const WIRE_FIXED64: u8 = 1;
/// Protobuf wire type of a length-delimited field (bytes, strings, messages, packed arrays).
pub const WIRE_LEN: u8 = 2;
/// Protobuf wire type of a fixed 32 bit field.
pub const WIRE_FIXED32: u8 = 5;

/// A simple alias for types implementing both `Seek` and `Read`.
pub trait SeekRead: Seek + Read {}

/// Reads values from a bounded byte source in a fixed byte order.
pub trait ValueReader<'a, E: ByteOrder + 'a> {
	/// Returns the underlying reader to access raw bytes.
	fn get_reader(&mut self) -> &mut dyn SeekRead;

	/// Total length of the readable window in bytes.
	fn len(&self) -> u64;

	/// Current position within the readable window.
	fn position(&mut self) -> u64;

	/// Moves the cursor to `position`.
	///
	/// # Errors
	/// Returns an error if the position lies outside the window.
	fn set_position(&mut self, position: u64) -> Result<()>;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn remaining(&mut self) -> u64 {
		self.len() - self.position()
	}

	fn has_remaining(&mut self) -> bool {
		self.remaining() > 0
	}

	/// Reads a base-128 varint.
	///
	/// # Errors
	/// Fails on truncated input or when the varint is longer than 10 bytes.
	fn read_varint(&mut self) -> Result<u64> {
		let mut value = 0;
		let mut shift = 0;
		loop {
			let byte = self.get_reader().read_u8()?;
			value |= (u64::from(byte) & 0x7F) << shift;
			if byte & 0x80 == 0 {
				break;
			}
			shift += 7;
			if shift >= 70 {
				bail!("Varint too long");
			}
		}
		Ok(value)
	}

	/// Reads a zigzag encoded varint (`sint32`/`sint64`).
	fn read_svarint(&mut self) -> Result<i64> {
		let sint_value = self.read_varint()? as i64;
		Ok((sint_value >> 1) ^ -(sint_value & 1))
	}

	fn read_f32(&mut self) -> Result<f32> {
		Ok(self.get_reader().read_f32::<E>()?)
	}

	fn read_f64(&mut self) -> Result<f64> {
		Ok(self.get_reader().read_f64::<E>()?)
	}

	fn read_u8(&mut self) -> Result<u8> {
		Ok(self.get_reader().read_u8()?)
	}

	fn read_i32(&mut self) -> Result<i32> {
		Ok(self.get_reader().read_i32::<E>()?)
	}

	fn read_u32(&mut self) -> Result<u32> {
		Ok(self.get_reader().read_u32::<E>()?)
	}

	fn read_u64(&mut self) -> Result<u64> {
		Ok(self.get_reader().read_u64::<E>()?)
	}

	/// Reads `length` raw bytes into a [`Blob`].
	///
	/// # Errors
	/// Fails if `length` exceeds the remaining bytes.
	fn read_blob(&mut self, length: u64) -> Result<Blob> {
		ensure!(
			length <= self.remaining(),
			"Requested {length} bytes, but only {} remain",
			self.remaining()
		);
		let mut blob = Blob::new_sized(length as usize);
		self.get_reader().read_exact(blob.as_mut_slice())?;
		Ok(blob)
	}

	/// Reads `length` bytes and decodes them as UTF-8.
	fn read_string(&mut self, length: u64) -> Result<String> {
		ensure!(
			length <= self.remaining(),
			"Requested string of {length} bytes, but only {} remain",
			self.remaining()
		);
		let mut vec = vec![0u8; length as usize];
		self.get_reader().read_exact(&mut vec)?;
		Ok(String::from_utf8(vec)?)
	}

	/// Reads a protobuf key and splits it into `(field_number, wire_type)`.
	fn read_pbf_key(&mut self) -> Result<(u32, u8)> {
		let value = self.read_varint().context("Failed to read varint for PBF key")?;
		Ok(((value >> 3) as u32, (value & 0x07) as u8))
	}

	/// Skips over the value of a field with the given wire type.
	///
	/// Decoders call this for every field number they do not understand, so newer writers
	/// can add fields without breaking older readers.
	///
	/// # Errors
	/// Fails on group wire types (3, 4), unknown wire types and truncated values.
	fn skip_pbf_field(&mut self, wire_type: u8) -> Result<()> {
		let skip = match wire_type {
			WIRE_VARINT => {
				self.read_varint().context("Failed to skip varint field")?;
				return Ok(());
			}
			WIRE_FIXED64 => 8,
			WIRE_LEN => self.read_varint().context("Failed to read length of skipped field")?,
			WIRE_FIXED32 => 4,
			_ => bail!("Unsupported wire type {wire_type}"),
		};
		ensure!(
			skip <= self.remaining(),
			"Skipped field of {skip} bytes exceeds remaining data"
		);
		let position = self.position();
		self.set_position(position + skip)
	}

	/// Returns a sub-reader over the next `length` bytes and advances past them.
	fn get_sub_reader<'b>(&'b mut self, length: u64) -> Result<Box<dyn ValueReader<'b, E> + 'b>>
	where
		E: 'b;

	/// Reads a varint length prefix and returns a sub-reader over the embedded message.
	fn get_pbf_sub_reader<'b>(&'b mut self) -> Result<Box<dyn ValueReader<'b, E> + 'b>>
	where
		E: 'b,
	{
		let length = self
			.read_varint()
			.context("Failed to read varint for sub-reader length")?;
		self.get_sub_reader(length).context("Failed to get sub-reader")
	}

	/// Reads a packed repeated `uint32` field.
	fn read_pbf_packed_uint32(&mut self) -> Result<Vec<u32>> {
		let mut reader = self
			.get_pbf_sub_reader()
			.context("Failed to get PBF sub-reader for packed uint32")?;
		let mut values = Vec::new();
		while reader.has_remaining() {
			values.push(
				reader
					.read_varint()
					.context("Failed to read varint for packed uint32")? as u32,
			);
		}
		drop(reader);
		Ok(values)
	}

	/// Reads a packed repeated `int32`/`int64`/`enum` field.
	fn read_pbf_packed_int64(&mut self) -> Result<Vec<i64>> {
		let mut reader = self
			.get_pbf_sub_reader()
			.context("Failed to get PBF sub-reader for packed int64")?;
		let mut values = Vec::new();
		while reader.has_remaining() {
			values.push(reader.read_varint().context("Failed to read packed int64")? as i64);
		}
		drop(reader);
		Ok(values)
	}

	/// Reads a packed repeated `sint32`/`sint64` field.
	fn read_pbf_packed_sint64(&mut self) -> Result<Vec<i64>> {
		let mut reader = self
			.get_pbf_sub_reader()
			.context("Failed to get PBF sub-reader for packed sint64")?;
		let mut values = Vec::new();
		while reader.has_remaining() {
			values.push(reader.read_svarint().context("Failed to read packed sint64")?);
		}
		drop(reader);
		Ok(values)
	}

	/// Reads a packed repeated `sint64` field and resolves the running delta,
	/// as used by dense node ids, coordinates and way refs.
	fn read_pbf_packed_delta(&mut self) -> Result<Vec<i64>> {
		let mut acc = 0i64;
		Ok(self
			.read_pbf_packed_sint64()?
			.into_iter()
			.map(|delta| {
				acc = acc.wrapping_add(delta);
				acc
			})
			.collect())
	}

	fn read_pbf_string(&mut self) -> Result<String> {
		let length = self.read_varint().context("Failed to read varint for string length")?;
		self.read_string(length).context("Failed to read PBF string")
	}

	fn read_pbf_blob(&mut self) -> Result<Blob> {
		let length = self.read_varint().context("Failed to read varint for blob length")?;
		self.read_blob(length).context("Failed to read PBF blob")
	}
}
