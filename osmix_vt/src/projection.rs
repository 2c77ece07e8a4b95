//! Web Mercator projection between WGS84 degrees and tile-local coordinates.

use crate::TileConfig;
use osmix_core::{GeoBBox, MAX_MERCATOR_LAT, TileCoord};
use std::f64::consts::PI;

/// Projects `[lon, lat]` into the coordinate space of one tile.
///
/// The tile covers `0..extent` on both axes with `y` pointing south. Positions outside the
/// tile project outside that range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileProjection {
	x: f64,
	y: f64,
	scale: f64,
	extent: f64,
	buffer: f64,
}

impl TileProjection {
	#[must_use]
	pub fn new(coord: &TileCoord, config: &TileConfig) -> TileProjection {
		TileProjection {
			x: f64::from(coord.x),
			y: f64::from(coord.y),
			scale: f64::from(coord.size()),
			extent: f64::from(config.extent),
			buffer: f64::from(config.buffer),
		}
	}

	#[must_use]
	pub fn project(&self, [lon, lat]: [f64; 2]) -> [f64; 2] {
		let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
		let world_x = (lon / 360.0 + 0.5) * self.scale;
		let world_y = (0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI)) * self.scale;
		[(world_x - self.x) * self.extent, (world_y - self.y) * self.extent]
	}

	#[must_use]
	pub fn unproject(&self, [tile_x, tile_y]: [f64; 2]) -> [f64; 2] {
		let world_x = (tile_x / self.extent + self.x) / self.scale;
		let world_y = (tile_y / self.extent + self.y) / self.scale;
		[
			(world_x - 0.5) * 360.0,
			(PI * (1.0 - 2.0 * world_y)).exp().atan().to_degrees() * 2.0 - 90.0,
		]
	}

	/// `[x_min, y_min, x_max, y_max]` of the buffered tile in tile coordinates.
	#[must_use]
	pub fn clip_rect(&self) -> [f64; 4] {
		[-self.buffer, -self.buffer, self.extent + self.buffer, self.extent + self.buffer]
	}

	/// Geographic extent of the buffered tile, clamped to the valid longitude range.
	#[must_use]
	pub fn query_bbox(&self) -> GeoBBox {
		let [x_min, y_max] = self.unproject([-self.buffer, -self.buffer]);
		let [x_max, y_min] = self.unproject([self.extent + self.buffer, self.extent + self.buffer]);
		GeoBBox {
			x_min: x_min.max(-180.0),
			y_min,
			x_max: x_max.min(180.0),
			y_max,
		}
	}
}
