use anyhow::{Error, Result, bail};
use osmix_geometry::vector_tile::DEFAULT_EXTENT;
use std::{fmt, str::FromStr};

/// Layer schema used when encoding tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileProfile {
	/// Layers `nodes`, `ways` and `relations` carrying the raw OSM tags.
	#[default]
	Default,
	/// The Shortbread basemap layers.
	Shortbread,
}

impl TileProfile {
	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			TileProfile::Default => "default",
			TileProfile::Shortbread => "shortbread",
		}
	}
}

impl fmt::Display for TileProfile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TileProfile {
	type Err = Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(match text.to_ascii_lowercase().as_str() {
			"default" => TileProfile::Default,
			"shortbread" => TileProfile::Shortbread,
			_ => bail!("unknown tile profile '{text}', expected 'default' or 'shortbread'"),
		})
	}
}

/// Tile encoding parameters.
///
/// `buffer` is the margin around the tile in tile units: geometry is selected and clipped
/// against the tile grown by this margin on every side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileConfig {
	pub extent: u32,
	pub buffer: u32,
	pub profile: TileProfile,
}

impl Default for TileConfig {
	fn default() -> Self {
		TileConfig {
			extent: DEFAULT_EXTENT,
			buffer: 64,
			profile: TileProfile::Default,
		}
	}
}

impl TileConfig {
	#[must_use]
	pub fn with_profile(mut self, profile: TileProfile) -> Self {
		self.profile = profile;
		self
	}
}
