use super::{geometry_type::GeomType, layer::VectorTileLayer};
use crate::{geo::*, math::area_ring};
use anyhow::{Context, Result, bail, ensure};
use byteorder::LE;
use log::trace;
use osmix_core::{
	Blob,
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
};

const MOVE_TO: u64 = 1;
const LINE_TO: u64 = 2;
const CLOSE_PATH: u64 = 7;

fn command(id: u64, count: usize) -> u64 {
	((count as u64) << 3) | id
}

/// A feature in wire form: tag indices into the layer tables plus encoded geometry commands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTileFeature {
	pub id: Option<u64>,
	pub tag_ids: Vec<u32>,
	pub geom_type: GeomType,
	pub geom_data: Blob,
}

impl VectorTileFeature {
	pub fn read(reader: &mut dyn ValueReader<'_, LE>) -> Result<VectorTileFeature> {
		let mut f = VectorTileFeature::default();

		while reader.has_remaining() {
			match reader.read_pbf_key().context("Failed to read PBF key")? {
				(1, 0) => f.id = Some(reader.read_varint().context("Failed to read feature ID")?),
				(2, 2) => f.tag_ids = reader.read_pbf_packed_uint32().context("Failed to read tag IDs")?,
				(3, 0) => f.geom_type = GeomType::from(reader.read_varint().context("Failed to read geometry type")?),
				(4, 2) => f.geom_data = reader.read_pbf_blob().context("Failed to read geometry data")?,
				(_, w) => reader.skip_pbf_field(w)?,
			}
		}

		Ok(f)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		if let Some(id) = self.id {
			writer.write_pbf_varint_field(1, id).context("Failed to write feature ID")?;
		}

		if !self.tag_ids.is_empty() {
			writer.write_pbf_key(2, 2)?;
			writer
				.write_pbf_packed_uint32(&self.tag_ids)
				.context("Failed to write tag IDs")?;
		}

		writer
			.write_pbf_varint_field(3, self.geom_type.as_u64())
			.context("Failed to write geometry type")?;

		if !self.geom_data.is_empty() {
			writer.write_pbf_key(4, 2)?;
			writer
				.write_pbf_blob(&self.geom_data)
				.context("Failed to write geometry data")?;
		}

		Ok(writer.into_blob())
	}

	/// Decodes the command stream into tile-space coordinates.
	pub fn to_geometry(&self) -> Result<Geometry> {
		let lines = {
			let mut reader = ValueReaderSlice::new_le(self.geom_data.as_slice());

			let mut lines: Coordinates2 = Vec::new();
			let mut line: Coordinates1 = Vec::new();
			let mut x = 0;
			let mut y = 0;

			while reader.has_remaining() {
				let value = reader
					.read_varint()
					.context("Failed to read varint for geometry command")?;
				let id = value & 0x7;
				let count = value >> 3;

				match id {
					MOVE_TO | LINE_TO => {
						for _ in 0..count {
							if id == MOVE_TO && !line.is_empty() {
								lines.push(line);
								line = Vec::new();
							}
							x += reader.read_svarint().context("Failed to read x coordinate")?;
							y += reader.read_svarint().context("Failed to read y coordinate")?;
							line.push([x as f64, y as f64]);
						}
					}
					CLOSE_PATH => {
						ensure!(!line.is_empty(), "ClosePath command found on an empty linestring");
						line.push(line[0]);
					}
					_ => bail!("Unknown command {id}"),
				}
			}

			if !line.is_empty() {
				lines.push(line);
			}

			lines
		};

		match self.geom_type {
			GeomType::Unknown => bail!("Unknown geometry type"),

			GeomType::MultiPoint => {
				ensure!(!lines.is_empty(), "(Multi)Points must not be empty");
				let mut points = Coordinates1::new();
				for line in lines {
					ensure!(line.len() == 1, "(Multi)Point entries must have exactly one entry");
					points.extend(line);
				}
				Ok(Geometry::MultiPoint(points))
			}

			GeomType::MultiLineString => {
				ensure!(!lines.is_empty(), "MultiLineStrings must have at least one entry");
				for line in &lines {
					ensure!(line.len() >= 2, "Each entry in MultiLineStrings must have at least two points");
				}
				Ok(Geometry::MultiLineString(lines))
			}

			GeomType::MultiPolygon => {
				ensure!(!lines.is_empty(), "Polygons must have at least one entry");
				let mut current_polygon = Vec::new();
				let mut polygons = Vec::new();

				for ring in lines {
					ensure!(
						ring.len() >= 4,
						"Each ring in Polygons must have at least four points (A,B,C,A)"
					);
					ensure!(
						ring[0] == ring[ring.len() - 1],
						"First and last point of the ring must be the same"
					);

					let area = area_ring(&ring);
					if area > 1e-14 {
						if !current_polygon.is_empty() {
							polygons.push(current_polygon);
							current_polygon = Vec::new();
						}
						current_polygon.push(ring);
					} else if area < -1e-14 {
						if current_polygon.is_empty() {
							trace!("An outer ring must precede inner rings");
						} else {
							current_polygon.push(ring);
						}
					} else {
						trace!("Ring with zero area");
					}
				}

				if !current_polygon.is_empty() {
					polygons.push(current_polygon);
				}

				Ok(Geometry::MultiPolygon(polygons))
			}
		}
	}

	pub fn to_feature(&self, layer: &VectorTileLayer) -> Result<GeoFeature> {
		let mut feature = GeoFeature::new(self.to_geometry().context("Failed to convert to geometry")?);
		feature.id = self.id;
		feature.properties = layer.decode_tag_ids(&self.tag_ids)?;
		Ok(feature)
	}

	/// Encodes tile-space geometry into MVT commands.
	///
	/// Coordinates are rounded to integers. Consecutive duplicate points are dropped, and
	/// lines or rings that collapse below their minimum size are skipped.
	pub fn from_geometry(id: Option<u64>, tag_ids: Vec<u32>, geometry: &Geometry) -> Result<VectorTileFeature> {
		struct Cursor {
			writer: ValueWriterBlob<LE>,
			x: i64,
			y: i64,
		}

		impl Cursor {
			fn point(&mut self, point: [i64; 2]) -> Result<()> {
				self.writer.write_svarint(point[0] - self.x)?;
				self.writer.write_svarint(point[1] - self.y)?;
				self.x = point[0];
				self.y = point[1];
				Ok(())
			}

			fn path(&mut self, points: &[[i64; 2]]) -> Result<()> {
				self.writer.write_varint(command(MOVE_TO, 1))?;
				self.point(points[0])?;
				self.writer.write_varint(command(LINE_TO, points.len() - 1))?;
				for point in &points[1..] {
					self.point(*point)?;
				}
				Ok(())
			}
		}

		fn quantize(line: &Coordinates1) -> Vec<[i64; 2]> {
			let mut points: Vec<[i64; 2]> = line
				.iter()
				.map(|c| [c[0].round() as i64, c[1].round() as i64])
				.collect();
			points.dedup();
			points
		}

		let mut cursor = Cursor {
			writer: ValueWriterBlob::new_le(),
			x: 0,
			y: 0,
		};

		match geometry {
			Geometry::MultiPoint(points) => {
				let points: Vec<[i64; 2]> = points
					.iter()
					.map(|c| [c[0].round() as i64, c[1].round() as i64])
					.collect();
				if !points.is_empty() {
					cursor.writer.write_varint(command(MOVE_TO, points.len()))?;
					for point in points {
						cursor.point(point)?;
					}
				}
			}
			Geometry::MultiLineString(lines) => {
				for line in lines {
					let points = quantize(line);
					if points.len() >= 2 {
						cursor.path(&points)?;
					}
				}
			}
			Geometry::MultiPolygon(polygons) => {
				for polygon in polygons {
					for ring in polygon {
						let mut points = quantize(ring);
						if points.first() == points.last() {
							points.pop();
						}
						if points.len() < 3 {
							continue;
						}
						cursor.path(&points)?;
						cursor.writer.write_varint(command(CLOSE_PATH, 1))?;
					}
				}
			}
		}

		Ok(VectorTileFeature {
			id,
			tag_ids,
			geom_type: GeomType::from(geometry),
			geom_data: cursor.writer.into_blob(),
		})
	}
}
