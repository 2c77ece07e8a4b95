//! `ValueReaderSlice`: a [`ValueReader`] over a borrowed byte slice.
//!
//! Sub-readers borrow the same slice, so nested protobuf messages are decoded without copying.

use super::{SeekRead, ValueReader};
use anyhow::{Result, anyhow, bail};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::{io::Cursor, marker::PhantomData};

/// Reads values from a byte slice in byte order `E`.
pub struct ValueReaderSlice<'a, E: ByteOrder> {
	_phantom: PhantomData<E>,
	cursor: Cursor<&'a [u8]>,
	len: u64,
}

impl<'a, E: ByteOrder> ValueReaderSlice<'a, E> {
	#[must_use]
	pub fn new(slice: &'a [u8]) -> ValueReaderSlice<'a, E> {
		ValueReaderSlice {
			_phantom: PhantomData,
			len: slice.len() as u64,
			cursor: Cursor::new(slice),
		}
	}
}

impl<'a> ValueReaderSlice<'a, LittleEndian> {
	/// Little-endian reader, the byte order of protobuf fixed-width fields.
	#[must_use]
	pub fn new_le(slice: &'a [u8]) -> ValueReaderSlice<'a, LittleEndian> {
		ValueReaderSlice::new(slice)
	}
}

impl<'a> ValueReaderSlice<'a, BigEndian> {
	/// Big-endian reader, used for the PBF frame length prefix.
	#[must_use]
	pub fn new_be(slice: &'a [u8]) -> ValueReaderSlice<'a, BigEndian> {
		ValueReaderSlice::new(slice)
	}
}

impl SeekRead for Cursor<&[u8]> {}

impl<'a, E: ByteOrder + 'a> ValueReader<'a, E> for ValueReaderSlice<'a, E> {
	fn get_reader(&mut self) -> &mut dyn SeekRead {
		&mut self.cursor
	}

	fn len(&self) -> u64 {
		self.len
	}

	fn position(&mut self) -> u64 {
		self.cursor.position()
	}

	fn set_position(&mut self, position: u64) -> Result<()> {
		if position > self.len {
			bail!("set position outside length")
		}
		self.cursor.set_position(position);
		Ok(())
	}

	fn get_sub_reader<'b>(&'b mut self, length: u64) -> Result<Box<dyn ValueReader<'b, E> + 'b>>
	where
		E: 'b,
	{
		let start = self.cursor.position();
		let end = start + length;
		if end > self.len {
			bail!("Requested sub-reader length exceeds remaining data");
		}

		self.cursor.set_position(end);
		Ok(Box::new(ValueReaderSlice {
			_phantom: PhantomData,
			len: length,
			cursor: Cursor::new(
				self
					.cursor
					.get_ref()
					.get(start as usize..end as usize)
					.ok_or(anyhow!("out of bounds"))?,
			),
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn byte_order() -> Result<()> {
		let data = &[0x01, 0x02, 0x03, 0x04];
		assert_eq!(ValueReaderSlice::new_le(data).read_u32()?, 0x0403_0201);
		assert_eq!(ValueReaderSlice::new_be(data).read_u32()?, 0x0102_0304);
		Ok(())
	}

	#[test]
	fn set_position() -> Result<()> {
		let mut reader = ValueReaderSlice::new_le(&[1, 2, 3]);
		reader.set_position(2)?;
		assert_eq!(reader.read_u8()?, 3);
		reader.set_position(3)?;
		assert!(!reader.has_remaining());
		assert!(reader.set_position(4).is_err());
		Ok(())
	}

	#[test]
	fn sub_reader_advances_parent() -> Result<()> {
		let mut reader = ValueReaderSlice::new_le(&[0x02, 0xAA, 0xBB, 0xCC]);
		{
			let mut sub = reader.get_pbf_sub_reader()?;
			assert_eq!(sub.len(), 2);
			assert_eq!(sub.read_u8()?, 0xAA);
			assert_eq!(sub.read_u8()?, 0xBB);
			assert!(sub.read_u8().is_err());
		}
		assert_eq!(reader.read_u8()?, 0xCC);
		Ok(())
	}

	#[test]
	fn sub_reader_out_of_bounds() {
		let mut reader = ValueReaderSlice::new_le(&[0x05, 0x01]);
		assert!(reader.get_pbf_sub_reader().is_err());
	}
}
