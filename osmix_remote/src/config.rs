use osmix_core::ConcurrencyLimits;
use osmix_osm::IndexOptions;
use osmix_vt::{DEFAULT_TILE_CACHE_SIZE, TileConfig};
use std::time::Duration;

/// Settings of a [`RemoteCoordinator`](crate::RemoteCoordinator).
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteConfig {
	/// Number of worker threads.
	pub workers: usize,
	pub tile: TileConfig,
	pub index: IndexOptions,
	/// Deadline of every call as seen by its caller. `None` waits forever.
	pub call_timeout: Option<Duration>,
	/// Tile cache budget in bytes, per dataset.
	pub tile_cache_size: usize,
}

impl Default for RemoteConfig {
	fn default() -> Self {
		RemoteConfig {
			workers: ConcurrencyLimits::default().cpu_bound,
			tile: TileConfig::default(),
			index: IndexOptions::default(),
			call_timeout: None,
			tile_cache_size: DEFAULT_TILE_CACHE_SIZE,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = RemoteConfig::default();
		assert!(config.workers >= 1);
		assert_eq!(config.call_timeout, None);
		assert_eq!(config.tile_cache_size, 16 * 1024 * 1024);
		assert_eq!(config.tile, TileConfig::default());
	}
}
