//! zlib compression, as used inside PBF file blocks.

use crate::Blob;
use anyhow::{Context, Result, ensure};
use flate2::bufread::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

/// Compresses data using zlib at the default level.
pub fn compress_zlib(blob: &Blob) -> Result<Blob> {
	let mut result: Vec<u8> = Vec::new();
	ZlibEncoder::new(blob.as_slice(), flate2::Compression::default())
		.read_to_end(&mut result)
		.context("Failed to compress zlib data")?;
	Ok(Blob::from(result))
}

/// Decompresses zlib data, refusing to inflate beyond `max_size` bytes.
pub fn decompress_zlib(blob: &Blob, max_size: u64) -> Result<Blob> {
	let mut result: Vec<u8> = Vec::new();
	ZlibDecoder::new(blob.as_slice())
		.take(max_size + 1)
		.read_to_end(&mut result)
		.context("Failed to decompress zlib data")?;
	ensure!(
		result.len() as u64 <= max_size,
		"Decompressed data exceeds {max_size} bytes"
	);
	Ok(Blob::from(result))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_data(size: usize) -> Blob {
		Blob::from(
			(0..size)
				.map(|i| ((i * 7919) % 251) as u8)
				.collect::<Vec<u8>>(),
		)
	}

	#[test]
	fn round_trip() -> Result<()> {
		let data = sample_data(100_000);
		let compressed = compress_zlib(&data)?;
		assert!(compressed.len() < data.len());
		assert_eq!(decompress_zlib(&compressed, 100_000)?, data);
		Ok(())
	}

	#[test]
	fn size_limit() -> Result<()> {
		let compressed = compress_zlib(&sample_data(1000))?;
		assert!(decompress_zlib(&compressed, 999).is_err());
		Ok(())
	}

	#[test]
	fn garbage_input() {
		assert!(decompress_zlib(&Blob::from(&[1u8, 2, 3, 4, 5]), 100).is_err());
	}
}
