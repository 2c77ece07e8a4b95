use anyhow::Result;
use osmix_vt::{TileConfig, TileProfile};
use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TileSection {
	/// Tile extent in tile units.
	#[serde()]
	pub extent: Option<u32>,

	/// Margin around each tile in tile units.
	#[serde()]
	pub buffer: Option<u32>,

	/// Layer schema: `default` or `shortbread`.
	#[serde()]
	pub profile: Option<String>,
}

impl TileSection {
	pub fn override_optional_profile(&mut self, profile: Option<&str>) {
		if let Some(profile) = profile {
			self.profile = Some(profile.to_string());
		}
	}

	pub fn apply(&self, tile: &mut TileConfig) -> Result<()> {
		if let Some(extent) = self.extent {
			tile.extent = extent;
		}
		if let Some(buffer) = self.buffer {
			tile.buffer = buffer;
		}
		if let Some(profile) = &self.profile {
			tile.profile = profile.parse::<TileProfile>()?;
		}
		Ok(())
	}
}
