//! `ValueWriterBlob`: a [`ValueWriter`] that collects its output in memory.

use super::ValueWriter;
use crate::Blob;
use anyhow::Result;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::io::{Cursor, Write};
use std::marker::PhantomData;

/// Writes values into a growable buffer in byte order `E`.
pub struct ValueWriterBlob<E: ByteOrder> {
	_phantom: PhantomData<E>,
	cursor: Cursor<Vec<u8>>,
}

impl<E: ByteOrder> ValueWriterBlob<E> {
	#[must_use]
	pub fn new() -> ValueWriterBlob<E> {
		ValueWriterBlob {
			_phantom: PhantomData,
			cursor: Cursor::new(Vec::new()),
		}
	}

	/// Consumes the writer and returns everything written so far.
	#[must_use]
	pub fn into_blob(self) -> Blob {
		Blob::from(self.cursor.into_inner())
	}
}

impl<E: ByteOrder> Default for ValueWriterBlob<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl ValueWriterBlob<LittleEndian> {
	#[must_use]
	pub fn new_le() -> ValueWriterBlob<LittleEndian> {
		ValueWriterBlob::new()
	}
}

impl ValueWriterBlob<BigEndian> {
	#[must_use]
	pub fn new_be() -> ValueWriterBlob<BigEndian> {
		ValueWriterBlob::new()
	}
}

impl<E: ByteOrder> ValueWriter<E> for ValueWriterBlob<E> {
	fn get_writer(&mut self) -> &mut dyn Write {
		&mut self.cursor
	}

	fn position(&mut self) -> Result<u64> {
		Ok(self.cursor.position())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn big_endian_u32() -> Result<()> {
		let mut writer = ValueWriterBlob::new_be();
		writer.write_u32(13)?;
		assert_eq!(writer.position()?, 4);
		assert_eq!(writer.into_blob().into_vec(), vec![0, 0, 0, 13]);
		Ok(())
	}

	#[test]
	fn empty() -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		assert!(writer.is_empty()?);
		writer.write_u8(1)?;
		assert!(!writer.is_empty()?);
		Ok(())
	}
}
