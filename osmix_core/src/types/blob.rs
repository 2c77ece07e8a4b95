//! [`Blob`]: an owned byte buffer.
//!
//! Blobs are the unit of ownership transfer between the caller and worker threads: PBF input is
//! moved into a load request and encoded tiles are moved back out, so no buffer is shared.
//!
//! ```rust
//! use osmix_core::Blob;
//!
//! let blob = Blob::from(vec![0, 1, 2, 3]);
//! assert_eq!(blob.len(), 4);
//! assert_eq!(blob.range(1..3), &[1, 2]);
//! ```

use anyhow::{Context, Result};
use std::fmt::Debug;
use std::ops::Range;
use std::path::Path;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

impl Blob {
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	/// Creates a zero-filled blob of `length` bytes.
	#[must_use]
	pub fn new_sized(length: usize) -> Blob {
		Blob(vec![0u8; length])
	}

	#[must_use]
	pub fn range(&self, range: Range<usize>) -> &[u8] {
		&self.0[range]
	}

	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		self.0.as_ref()
	}

	pub fn as_mut_slice(&mut self) -> &mut [u8] {
		self.0.as_mut()
	}

	#[must_use]
	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	/// Hex dump with one space between bytes, for logs and test failures.
	#[must_use]
	pub fn as_hex(&self) -> String {
		self
			.0
			.iter()
			.map(|byte| format!("{byte:02x}"))
			.collect::<Vec<_>>()
			.join(" ")
	}

	#[must_use]
	pub fn len(&self) -> u64 {
		self.0.len() as u64
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn save_to_file(&self, path: &Path) -> Result<()> {
		std::fs::write(path, &self.0).with_context(|| format!("Failed to write {}", path.display()))
	}

	pub fn load_from_file(path: &Path) -> Result<Self> {
		let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
		Ok(Blob::from(data))
	}
}

impl From<Vec<u8>> for Blob {
	fn from(item: Vec<u8>) -> Self {
		Blob(item)
	}
}

impl From<&[u8]> for Blob {
	fn from(item: &[u8]) -> Self {
		Blob(item.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(item: &[u8; N]) -> Self {
		Blob(item.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(item: &str) -> Self {
		Blob(item.as_bytes().to_vec())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		const PREVIEW: usize = 32;
		if self.0.len() <= PREVIEW {
			write!(f, "Blob({}): {}", self.0.len(), self.as_hex())
		} else {
			let head = Blob::from(&self.0[..PREVIEW]);
			write!(f, "Blob({}): {} ...", self.0.len(), head.as_hex())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn basics() {
		let blob = Blob::from(&[1u8, 2, 3]);
		assert_eq!(blob.len(), 3);
		assert!(!blob.is_empty());
		assert!(Blob::new_empty().is_empty());
		assert_eq!(Blob::new_sized(2).into_vec(), vec![0, 0]);
		assert_eq!(Blob::from("ab").as_slice(), b"ab");
	}

	#[test]
	fn debug_output() {
		assert_eq!(format!("{:?}", Blob::from(&[0xABu8, 0x01])), "Blob(2): ab 01");
		let long = Blob::new_sized(40);
		assert!(format!("{long:?}").starts_with("Blob(40): 00 00"));
		assert!(format!("{long:?}").ends_with(" ..."));
	}

	#[test]
	fn file_round_trip() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("data.bin");
		Blob::from(&[9u8, 8, 7]).save_to_file(&path)?;
		assert_eq!(Blob::load_from_file(&path)?.into_vec(), vec![9, 8, 7]);
		assert!(Blob::load_from_file(&dir.path().join("missing")).is_err());
		Ok(())
	}
}
