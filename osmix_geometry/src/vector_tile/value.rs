use crate::geo::GeoValue;
use anyhow::{Context, Result, anyhow};
use byteorder::LE;
use osmix_core::{
	Blob,
	io::{ValueReader, ValueWriter, ValueWriterBlob},
};

/// Protobuf encoding of a layer value message.
pub trait GeoValuePBF<'a> {
	fn read(reader: &mut dyn ValueReader<'a, LE>) -> Result<GeoValue>;
	fn to_blob(&self) -> Result<Blob>;
}

impl<'a> GeoValuePBF<'a> for GeoValue {
	fn read(reader: &mut dyn ValueReader<'a, LE>) -> Result<GeoValue> {
		use GeoValue::*;
		let mut value: Option<GeoValue> = None;

		while reader.has_remaining() {
			match reader.read_pbf_key().context("Failed to read PBF key")? {
				(1, 2) => value = Some(String(reader.read_pbf_string().context("Failed to read string value")?)),
				(2, 5) => value = Some(Float(reader.read_f32().context("Failed to read f32 value")?)),
				(3, 1) => value = Some(Double(reader.read_f64().context("Failed to read f64 value")?)),
				(4, 0) => value = Some(Int(reader.read_varint().context("Failed to read int value")? as i64)),
				(5, 0) => value = Some(UInt(reader.read_varint().context("Failed to read uint value")?)),
				(6, 0) => value = Some(Int(reader.read_svarint().context("Failed to read sint value")?)),
				(7, 0) => value = Some(Bool(reader.read_varint().context("Failed to read bool value")? != 0)),
				(_, w) => reader.skip_pbf_field(w)?,
			}
		}
		value
			.ok_or_else(|| anyhow!("No value found"))
			.context("Failed to read GeoValue")
	}

	fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		match self {
			GeoValue::String(s) => {
				writer.write_pbf_key(1, 2)?;
				writer.write_pbf_string(s).context("Failed to write string value")?;
			}
			GeoValue::Float(f) => {
				writer.write_pbf_key(2, 5)?;
				writer.write_f32(*f).context("Failed to write float value")?;
			}
			GeoValue::Double(f) => {
				writer.write_pbf_key(3, 1)?;
				writer.write_f64(*f).context("Failed to write double value")?;
			}
			GeoValue::UInt(u) => writer.write_pbf_varint_field(5, *u).context("Failed to write uint value")?,
			GeoValue::Int(i) => writer.write_pbf_svarint_field(6, *i).context("Failed to write int value")?,
			GeoValue::Bool(b) => writer
				.write_pbf_varint_field(7, u64::from(*b))
				.context("Failed to write bool value")?,
		}

		Ok(writer.into_blob())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use osmix_core::io::ValueReaderSlice;
	use rstest::rstest;

	#[test]
	fn read_string() -> Result<()> {
		let data = vec![0x0A, 0x05, b'h', b'e', b'l', b'l', b'o'];
		let mut reader = ValueReaderSlice::new_le(&data);
		assert_eq!(GeoValue::read(&mut reader)?, GeoValue::from("hello"));
		Ok(())
	}

	#[test]
	fn read_plain_int() -> Result<()> {
		let mut reader = ValueReaderSlice::new_le(&[0x20, 0x2A]);
		assert_eq!(GeoValue::read(&mut reader)?, GeoValue::Int(42));
		Ok(())
	}

	#[test]
	fn read_empty() {
		let mut reader = ValueReaderSlice::new_le(&[]);
		assert!(GeoValue::read(&mut reader).is_err());
	}

	#[rstest]
	#[case(GeoValue::from("ab"), &[0x0A, 0x02, b'a', b'b'])]
	#[case(GeoValue::UInt(300), &[0x28, 0xAC, 0x02])]
	#[case(GeoValue::Int(-1), &[0x30, 0x01])]
	#[case(GeoValue::Bool(true), &[0x38, 0x01])]
	fn wire_bytes(#[case] value: GeoValue, #[case] expected: &[u8]) -> Result<()> {
		assert_eq!(value.to_blob()?.as_slice(), expected);
		Ok(())
	}
}
