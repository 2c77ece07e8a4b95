//! [`TileCoord`]: the `(z, x, y)` address of a tile in the Web Mercator pyramid.
//!
//! ```
//! use osmix_core::TileCoord;
//!
//! let coord: TileCoord = "5/6/7".parse().unwrap();
//! assert_eq!((coord.level, coord.x, coord.y), (5, 6, 7));
//! let [lon, lat] = coord.as_geo();
//! assert!(lon < 0.0 && lat > 0.0);
//! ```

use crate::{GeoBBox, MAX_MERCATOR_LAT};
use anyhow::{Context, Error, Result, ensure};
use std::{
	f64::consts::PI,
	fmt::{self, Debug, Display},
	str::FromStr,
};

#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	pub level: u8,
	pub x: u32,
	pub y: u32,
}

impl TileCoord {
	/// Creates a coordinate; `x` and `y` must be below `2^level`.
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		let max = 2u32.pow(u32::from(level));
		ensure!(x < max, "x ({x}) out of bounds for level {level}");
		ensure!(y < max, "y ({y}) out of bounds for level {level}");
		Ok(TileCoord { level, x, y })
	}

	/// The tile containing the point `(lon, lat)` at zoom `z`.
	pub fn from_geo(lon: f64, lat: f64, z: u8) -> Result<TileCoord> {
		ensure!(z <= 31, "z ({z}) must be <= 31");
		ensure!((-180.0..=180.0).contains(&lon), "lon ({lon}) must be within [-180, 180]");
		ensure!((-90.0..=90.0).contains(&lat), "lat ({lat}) must be within [-90, 90]");

		let zoom: f64 = 2.0f64.powi(i32::from(z));
		let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
		let x = zoom * (lon / 360.0 + 0.5);
		let y = zoom * (0.5 - 0.5 * (lat * PI / 360.0 + PI / 4.0).tan().ln() / PI);

		TileCoord::new(
			z,
			x.min(zoom - 1.0).max(0.0).floor() as u32,
			y.min(zoom - 1.0).max(0.0).floor() as u32,
		)
	}

	/// The geographic position `[lon, lat]` of the north-west corner of tile `(x, y)`.
	///
	/// `x` and `y` may equal `2^level` to address the far edge of the world.
	#[must_use]
	pub fn coord_to_geo(level: u8, x: u32, y: u32) -> [f64; 2] {
		let zoom: f64 = 2.0f64.powi(i32::from(level));
		[
			(f64::from(x) / zoom - 0.5) * 360.0,
			((PI * (1.0 - 2.0 * f64::from(y) / zoom)).exp().atan() / PI - 0.25) * 360.0,
		]
	}

	#[must_use]
	pub fn as_geo(&self) -> [f64; 2] {
		TileCoord::coord_to_geo(self.level, self.x, self.y)
	}

	/// Geographic extent of the tile.
	#[must_use]
	pub fn to_geo_bbox(&self) -> GeoBBox {
		let [x_min, y_max] = self.as_geo();
		let [x_max, y_min] = TileCoord::coord_to_geo(self.level, self.x + 1, self.y + 1);
		GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
	}

	/// Number of tiles along one axis at this level.
	#[must_use]
	pub fn size(&self) -> u32 {
		1u32 << self.level
	}
}

impl FromStr for TileCoord {
	type Err = Error;

	/// Parses `"z/x/y"`.
	fn from_str(text: &str) -> Result<Self> {
		let parts: Vec<&str> = text.split('/').collect();
		ensure!(parts.len() == 3, "tile coordinate '{text}' must look like z/x/y");
		let level = parts[0].parse::<u8>().with_context(|| format!("invalid zoom in '{text}'"))?;
		let x = parts[1].parse::<u32>().with_context(|| format!("invalid x in '{text}'"))?;
		let y = parts[2].parse::<u32>().with_context(|| format!("invalid y in '{text}'"))?;
		TileCoord::new(level, x, y)
	}
}

impl Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.level, self.x, self.y)
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("TileCoord({}, [{}, {}])", &self.level, &self.x, &self.y))
	}
}
