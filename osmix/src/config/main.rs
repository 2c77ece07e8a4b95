use super::{IndexConfig, TileSection};
use anyhow::{Context, Result, ensure};
use osmix_remote::RemoteConfig;
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
	time::Duration,
};

#[derive(Default, Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
	/// Number of worker threads; defaults to the number of CPUs.
	#[serde(default)]
	pub workers: Option<usize>,

	/// Seconds a single call may take before it fails with a timeout.
	#[serde(default)]
	pub call_timeout: Option<f64>,

	/// Tile cache budget per dataset, in bytes.
	#[serde(default)]
	pub tile_cache_size: Option<usize>,

	/// Vector tile settings
	#[serde(default)]
	pub tile: TileSection,

	/// Spatial index settings
	#[serde(default)]
	pub index: IndexConfig,
}

impl Config {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		Ok(serde_yaml_ng::from_reader(reader)?)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("Failed to open config file {path:?}"))?;
		Config::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse config file {path:?}"))
	}

	/// Reads `path` if given, otherwise returns the defaults.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		match path {
			Some(path) => Config::from_path(path),
			None => Ok(Config::default()),
		}
	}

	pub fn override_optional_workers(&mut self, workers: Option<usize>) {
		if workers.is_some() {
			self.workers = workers;
		}
	}

	pub fn to_remote_config(&self) -> Result<RemoteConfig> {
		let mut config = RemoteConfig::default();
		if let Some(workers) = self.workers {
			ensure!(workers > 0, "workers must be at least 1");
			config.workers = workers;
		}
		if let Some(seconds) = self.call_timeout {
			config.call_timeout =
				Some(Duration::try_from_secs_f64(seconds).with_context(|| format!("invalid call_timeout {seconds}"))?);
		}
		if let Some(size) = self.tile_cache_size {
			config.tile_cache_size = size;
		}
		self.tile.apply(&mut config.tile)?;
		self.index.apply(&mut config.index);
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use osmix_vt::TileProfile;
	use pretty_assertions::assert_eq;

	#[test]
	fn parse_full_config() -> Result<()> {
		let config = Config::from_string(
			"
workers: 3
call_timeout: 2.5
tile_cache_size: 1048576
tile:
  extent: 512
  buffer: 8
  profile: shortbread
index:
  way_centroids: true
",
		)?;
		assert_eq!(
			config,
			Config {
				workers: Some(3),
				call_timeout: Some(2.5),
				tile_cache_size: Some(1_048_576),
				tile: TileSection {
					extent: Some(512),
					buffer: Some(8),
					profile: Some("shortbread".to_string()),
				},
				index: IndexConfig {
					way_centroids: Some(true),
					relation_centroids: None,
				},
			}
		);

		let remote = config.to_remote_config()?;
		assert_eq!(remote.workers, 3);
		assert_eq!(remote.call_timeout, Some(Duration::from_millis(2500)));
		assert_eq!(remote.tile_cache_size, 1_048_576);
		assert_eq!(remote.tile.extent, 512);
		assert_eq!(remote.tile.buffer, 8);
		assert_eq!(remote.tile.profile, TileProfile::Shortbread);
		assert!(remote.index.way_centroids);
		assert!(!remote.index.relation_centroids);
		Ok(())
	}

	#[test]
	fn empty_config_keeps_defaults() -> Result<()> {
		let config = Config::from_string("{}")?;
		assert_eq!(config, Config::default());
		assert_eq!(config.to_remote_config()?, RemoteConfig::default());
		Ok(())
	}

	#[test]
	fn unknown_fields_are_rejected() {
		assert!(Config::from_string("threads: 4").is_err());
		assert!(Config::from_string("tile:\n  layers: 4").is_err());
	}

	#[test]
	fn invalid_values() -> Result<()> {
		assert!(Config::from_string("workers: 0")?.to_remote_config().is_err());
		assert!(Config::from_string("call_timeout: -1")?.to_remote_config().is_err());
		let error = Config::from_string("tile:\n  profile: fancy")?.to_remote_config().unwrap_err();
		assert!(error.to_string().contains("unknown tile profile 'fancy'"));
		Ok(())
	}

	#[test]
	fn overrides() {
		let mut config = Config::default();
		config.override_optional_workers(Some(2));
		config.override_optional_workers(None);
		config.tile.override_optional_profile(Some("shortbread"));
		assert_eq!(config.workers, Some(2));
		assert_eq!(config.tile.profile.as_deref(), Some("shortbread"));
	}
}
