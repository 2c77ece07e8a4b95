//! A single vector tile layer.
//!
//! Wire layout:
//!  * field 1: `name` (string)
//!  * field 2: repeated `feature` (embedded message)
//!  * field 3: repeated `keys` (string)
//!  * field 4: repeated `values` (embedded message)
//!  * field 5: `extent` (varint, default 4096)
//!  * field 15: `version` (varint)

use super::{feature::VectorTileFeature, property_manager::PropertyManager, value::GeoValuePBF};
use crate::geo::{GeoFeature, GeoProperties, GeoValue};
use anyhow::{Context, Result, anyhow};
use byteorder::LE;
use osmix_core::{
	Blob,
	io::{ValueReader, ValueWriter, ValueWriterBlob},
};

pub const DEFAULT_EXTENT: u32 = 4096;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTileLayer {
	pub extent: u32,
	pub features: Vec<VectorTileFeature>,
	pub name: String,
	pub property_manager: PropertyManager,
	pub version: u32,
}

impl VectorTileLayer {
	#[must_use]
	pub fn new(name: String, extent: u32, version: u32) -> VectorTileLayer {
		VectorTileLayer {
			extent,
			features: vec![],
			name,
			property_manager: PropertyManager::default(),
			version,
		}
	}

	/// Version 2 layer with the default extent.
	#[must_use]
	pub fn new_standard(name: &str) -> VectorTileLayer {
		VectorTileLayer::new(name.to_string(), DEFAULT_EXTENT, 2)
	}

	pub fn read(reader: &mut dyn ValueReader<'_, LE>) -> Result<VectorTileLayer> {
		let mut extent = DEFAULT_EXTENT;
		let mut features: Vec<VectorTileFeature> = Vec::new();
		let mut name = None;
		let mut property_manager = PropertyManager::new();
		let mut version = 1;

		while reader.has_remaining() {
			match reader.read_pbf_key().context("Failed to read PBF key")? {
				(1, 2) => name = Some(reader.read_pbf_string().context("Failed to read layer name")?),
				(2, 2) => features.push(
					VectorTileFeature::read(
						reader
							.get_pbf_sub_reader()
							.context("Failed to get PBF sub-reader for feature")?
							.as_mut(),
					)
					.context("Failed to read VectorTileFeature")?,
				),
				(3, 2) => {
					property_manager.add_key(reader.read_pbf_string().context("Failed to read property key")?);
				}
				(4, 2) => {
					property_manager.add_val(
						GeoValue::read(
							reader
								.get_pbf_sub_reader()
								.context("Failed to get PBF sub-reader for property value")?
								.as_mut(),
						)
						.context("Failed to read GeoValue")?,
					);
				}
				(5, 0) => extent = u32::try_from(reader.read_varint().context("Failed to read extent")?)?,
				(15, 0) => version = u32::try_from(reader.read_varint().context("Failed to read version")?)?,
				(_, w) => reader.skip_pbf_field(w)?,
			}
		}

		Ok(VectorTileLayer {
			extent,
			features,
			name: name.ok_or(anyhow!("Layer name is required"))?,
			property_manager,
			version,
		})
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		writer.write_pbf_key(1, 2)?;
		writer.write_pbf_string(&self.name).context("Failed to write layer name")?;

		for feature in &self.features {
			writer.write_pbf_key(2, 2)?;
			writer
				.write_pbf_blob(&feature.to_blob().context("Failed to convert feature to blob")?)
				.context("Failed to write feature blob")?;
		}

		for key in self.property_manager.key.iter() {
			writer.write_pbf_key(3, 2)?;
			writer.write_pbf_string(key).context("Failed to write property key")?;
		}

		for value in self.property_manager.val.iter() {
			writer.write_pbf_key(4, 2)?;
			writer
				.write_pbf_blob(&value.to_blob().context("Failed to convert property value to blob")?)
				.context("Failed to write property value blob")?;
		}

		if self.extent != DEFAULT_EXTENT {
			writer
				.write_pbf_varint_field(5, u64::from(self.extent))
				.context("Failed to write extent")?;
		}

		writer
			.write_pbf_varint_field(15, u64::from(self.version))
			.context("Failed to write version")?;

		Ok(writer.into_blob())
	}

	pub fn to_features(&self) -> Result<Vec<GeoFeature>> {
		self
			.features
			.iter()
			.map(|feature| feature.to_feature(self).context("Failed to convert VectorTileFeature"))
			.collect()
	}

	pub fn encode_tag_ids(&mut self, properties: GeoProperties) -> Vec<u32> {
		self.property_manager.encode_tag_ids(properties)
	}

	pub fn decode_tag_ids(&self, tag_ids: &[u32]) -> Result<GeoProperties> {
		self.property_manager.decode_tag_ids(tag_ids)
	}

	/// Builds a layer from tile-space features.
	///
	/// Key and value tables are ordered by frequency. Features whose geometry quantizes to
	/// nothing are left out.
	pub fn from_features(name: String, features: Vec<GeoFeature>, extent: u32, version: u32) -> Result<VectorTileLayer> {
		let mut property_manager = PropertyManager::from_iter(features.iter().map(|f| &f.properties));

		let mut vt_features = Vec::with_capacity(features.len());
		for feature in features {
			let vt_feature = VectorTileFeature::from_geometry(
				feature.id,
				property_manager.encode_tag_ids(feature.properties),
				&feature.geometry,
			)?;
			if !vt_feature.geom_data.is_empty() {
				vt_features.push(vt_feature);
			}
		}

		Ok(VectorTileLayer {
			extent,
			features: vt_features,
			name,
			property_manager,
			version,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::geo::Geometry;
	use osmix_core::io::ValueReaderSlice;
	use pretty_assertions::assert_eq;

	#[test]
	fn features_survive_the_wire() -> Result<()> {
		let example = GeoFeature::new_example();
		let layer = VectorTileLayer::from_features("buildings".into(), vec![example.clone()], 4096, 2)?;
		assert_eq!(layer.property_manager.key.len(), 3);

		let blob = layer.to_blob()?;
		let decoded = VectorTileLayer::read(&mut ValueReaderSlice::new_le(blob.as_slice()))?;
		assert_eq!(decoded, layer);
		assert_eq!(decoded.to_features()?, vec![example]);
		Ok(())
	}

	#[test]
	fn non_default_extent() -> Result<()> {
		let layer = VectorTileLayer::new("x".into(), 512, 2);
		let blob = layer.to_blob()?;
		let decoded = VectorTileLayer::read(&mut ValueReaderSlice::new_le(blob.as_slice()))?;
		assert_eq!(decoded.extent, 512);
		assert_eq!(decoded.version, 2);
		Ok(())
	}

	#[test]
	fn empty_geometries_are_skipped() -> Result<()> {
		let features = vec![
			GeoFeature::new(Geometry::MultiPoint(vec![])),
			GeoFeature::new(Geometry::new_point([1.0, 1.0])),
		];
		let layer = VectorTileLayer::from_features("pois".into(), features, 4096, 2)?;
		assert_eq!(layer.features.len(), 1);
		Ok(())
	}

	#[test]
	fn missing_name() {
		// extent only
		let data = [0x28, 0x80, 0x04];
		assert!(VectorTileLayer::read(&mut ValueReaderSlice::new_le(&data)).is_err());
	}
}
