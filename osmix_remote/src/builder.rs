//! Builder pattern for constructing [`RemoteCoordinator`] instances

use crate::{Event, EventBus, RemoteConfig, RemoteCoordinator, StrategyFactory};
use anyhow::Result;
use log::{debug, info, warn};
use osmix_osm::IndexOptions;
use osmix_vt::{TileConfig, TileEncoderStrategy, TileProfile, strategy_for};
use std::{sync::Arc, time::Duration};

/// Picks the strategy from the configured tile profile.
fn profile_strategies() -> StrategyFactory {
	Arc::new(strategy_for)
}

/// Builder for a [`RemoteCoordinator`].
///
/// Unless [`silent`](RuntimeBuilder::silent) is set, steps and warnings are written to the
/// `log` facade and progress messages at debug level.
///
/// ```no_run
/// use osmix_remote::RemoteCoordinator;
/// use osmix_vt::TileProfile;
/// use std::time::Duration;
///
/// let coordinator = RemoteCoordinator::builder()
///     .workers(4)
///     .tile_profile(TileProfile::Shortbread)
///     .call_timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// ```
pub struct RuntimeBuilder {
	config: RemoteConfig,
	factory: Option<StrategyFactory>,
	silent: bool,
}

impl RuntimeBuilder {
	#[must_use]
	pub fn new() -> Self {
		Self {
			config: RemoteConfig::default(),
			factory: None,
			silent: false,
		}
	}

	/// Replaces all settings.
	pub fn config(mut self, config: RemoteConfig) -> Self {
		self.config = config;
		self
	}

	pub fn workers(mut self, workers: usize) -> Self {
		self.config.workers = workers;
		self
	}

	pub fn tile_config(mut self, tile: TileConfig) -> Self {
		self.config.tile = tile;
		self
	}

	pub fn tile_profile(mut self, profile: TileProfile) -> Self {
		self.config.tile.profile = profile;
		self
	}

	pub fn tile_cache_size(mut self, bytes: usize) -> Self {
		self.config.tile_cache_size = bytes;
		self
	}

	pub fn index_options(mut self, options: IndexOptions) -> Self {
		self.config.index = options;
		self
	}

	/// Uses a custom tile strategy for every dataset instead of the one selected by the tile
	/// profile.
	pub fn tile_strategy<F>(mut self, factory: F) -> Self
	where
		F: Fn(&TileConfig, usize) -> Box<dyn TileEncoderStrategy> + Send + Sync + 'static,
	{
		self.factory = Some(Arc::new(factory));
		self
	}

	pub fn call_timeout(mut self, timeout: Duration) -> Self {
		self.config.call_timeout = Some(timeout);
		self
	}

	/// Do not forward events to the `log` facade.
	pub fn silent(mut self) -> Self {
		self.silent = true;
		self
	}

	/// Spawns the worker threads.
	pub fn build(self) -> Result<RemoteCoordinator> {
		let events = EventBus::new();
		if !self.silent {
			events.subscribe(|event| match event {
				Event::Step { message } => info!("{message}"),
				Event::Warning { message } => warn!("{message}"),
				Event::Progress(progress) => debug!("{} #{}: {}", progress.dataset, progress.request_id, progress.message),
				Event::Log { .. } => {}
			});
		}
		let factory = self.factory.unwrap_or_else(profile_strategies);
		RemoteCoordinator::start(&self.config, factory, events)
	}
}

impl Default for RuntimeBuilder {
	fn default() -> Self {
		Self::new()
	}
}
