//! Worker threads. Each worker owns its datasets outright and answers requests in the order
//! they arrive.

use crate::{
	EventBus, StrategyFactory,
	protocol::{DatasetInfo, Method, Nearby, Request, Response},
};
use anyhow::{Context, Result, anyhow};
use log::{debug, trace, warn};
use osmix_core::{Blob, TileCoord};
use osmix_osm::{EntityStore, IndexOptions, OsmChanges, OsmixError, SpatialIndex};
use osmix_vt::{TileConfig, TileEncoderStrategy, TileSource};
use std::{
	any::Any,
	collections::HashMap,
	panic::{self, AssertUnwindSafe},
	thread::{self, JoinHandle},
};
use tokio::sync::mpsc;

struct Dataset {
	store: EntityStore,
	index: SpatialIndex,
	/// Created on the first tile request, dropped on edit.
	strategy: Option<Box<dyn TileEncoderStrategy>>,
}

/// Everything a worker thread needs besides its request queue.
#[derive(Clone)]
pub(crate) struct WorkerSettings {
	pub tile: TileConfig,
	pub index: IndexOptions,
	pub tile_cache_size: usize,
	pub factory: StrategyFactory,
	pub events: EventBus,
}

struct WorkerState {
	worker: usize,
	settings: WorkerSettings,
	datasets: HashMap<String, Dataset>,
}

fn not_found(dataset: &str) -> anyhow::Error {
	OsmixError::DatasetNotFound(dataset.to_string()).into()
}

impl WorkerState {
	fn dataset(&mut self, id: &str) -> Result<&mut Dataset> {
		self.datasets.get_mut(id).ok_or_else(|| not_found(id))
	}

	fn info(&self, id: &str) -> Result<DatasetInfo> {
		let dataset = self.datasets.get(id).ok_or_else(|| not_found(id))?;
		Ok(DatasetInfo {
			id: id.to_string(),
			worker: self.worker,
			header: dataset.store.header().clone(),
			stats: dataset.store.stats(),
			bbox: dataset.store.bbox_all(),
			incomplete: dataset.store.validation().len(),
		})
	}

	fn load(&mut self, request_id: u64, id: &str, data: &Blob) -> Result<DatasetInfo> {
		let events = self.settings.events.clone();
		events.step(format!("ingesting '{id}' on worker {}", self.worker));
		let store = EntityStore::from_pbf_with_progress(data, &mut |message| events.progress(request_id, id, message))
			.with_context(|| format!("Failed to load dataset '{id}'"))?;
		let index = SpatialIndex::build(&store, self.settings.index);

		let incomplete = store.validation().len();
		if incomplete > 0 {
			events.warn(format!("'{id}': {incomplete} entities reference missing members"));
		}
		self.datasets.insert(
			id.to_string(),
			Dataset {
				store,
				index,
				strategy: None,
			},
		);
		events.step(format!("'{id}' is ready"));
		self.info(id)
	}

	fn tile(&mut self, id: &str, coord: &TileCoord) -> Result<Blob> {
		let settings = self.settings.clone();
		let Dataset {
			store,
			index,
			strategy,
		} = self.dataset(id)?;
		let strategy = strategy.get_or_insert_with(|| (settings.factory)(&settings.tile, settings.tile_cache_size));
		strategy
			.get_tile(&TileSource::new(store, index), coord)
			.with_context(|| format!("Failed to get tile {coord} of '{id}'"))
	}

	fn edit(&mut self, id: &str, changes: &OsmChanges) -> Result<DatasetInfo> {
		let options = self.settings.index;
		let dataset = self.dataset(id)?;
		let mut store = dataset.store.clone();
		store
			.apply_changes(changes)
			.with_context(|| format!("Failed to edit dataset '{id}'"))?;
		dataset.index = SpatialIndex::build(&store, options);
		dataset.store = store;
		dataset.strategy = None;
		self.info(id)
	}

	fn handle(&mut self, request_id: u64, method: Method) -> Result<Response> {
		trace!("worker {} handles request {request_id}: {} '{}'", self.worker, method.name(), method.dataset());
		Ok(match method {
			Method::Load { dataset, data } => Response::Info(self.load(request_id, &dataset, &data)?),
			Method::Info { dataset } => Response::Info(self.info(&dataset)?),
			Method::Entity { dataset, kind, id } => Response::Entity(self.dataset(&dataset)?.store.get_by_id(kind, id)?),
			Method::Search { dataset, key, value } => {
				let store = &self.dataset(&dataset)?.store;
				Response::Entities(
					store
						.search(&key, value.as_deref())
						.into_iter()
						.filter_map(|entity| store.resolve(entity))
						.collect(),
				)
			}
			Method::Tile { dataset, coord } => Response::Tile(self.tile(&dataset, &coord)?),
			Method::Nearest {
				dataset,
				point,
				k,
				max_distance,
			} => {
				let Dataset { store, index, .. } = self.dataset(&dataset)?;
				Response::Nearest(
					index
						.nearest(store, point, k, max_distance)?
						.into_iter()
						.filter_map(|neighbor| {
							Some(Nearby {
								entity: store.resolve(neighbor.entity)?,
								distance: neighbor.distance,
							})
						})
						.collect(),
				)
			}
			Method::Edit { dataset, changes } => Response::Info(self.edit(&dataset, &changes)?),
			Method::Delete { dataset } => {
				self.datasets.remove(&dataset).ok_or_else(|| not_found(&dataset))?;
				debug!("worker {} dropped '{dataset}'", self.worker);
				Response::Done
			}
		})
	}

	/// Answers a request, turning a panic into an error so the thread and its other datasets
	/// survive. A dataset whose tile encoder panicked gets a fresh encoder on the next request.
	fn handle_isolated(&mut self, request_id: u64, method: Method) -> Result<Response> {
		let name = method.dataset().to_string();
		let result = panic::catch_unwind(AssertUnwindSafe(|| self.handle(request_id, method)));
		result.unwrap_or_else(|payload| {
			let message = panic_message(payload.as_ref());
			warn!("worker {} panicked on request {request_id}: {message}", self.worker);
			if let Some(dataset) = self.datasets.get_mut(&name) {
				dataset.strategy = None;
			}
			Err(anyhow!("request {request_id} on dataset '{name}' panicked: {message}"))
		})
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.as_str()
	} else {
		"unknown panic"
	}
}

/// Handle to one worker thread.
pub(crate) struct Worker {
	sender: Option<mpsc::UnboundedSender<Request>>,
	handle: Option<JoinHandle<()>>,
}

impl Worker {
	pub fn spawn(worker: usize, settings: WorkerSettings) -> Result<Worker> {
		let (sender, mut receiver) = mpsc::unbounded_channel::<Request>();
		let mut state = WorkerState {
			worker,
			settings,
			datasets: HashMap::new(),
		};
		let handle = thread::Builder::new()
			.name(format!("osmix-worker-{worker}"))
			.spawn(move || {
				while let Some(request) = receiver.blocking_recv() {
					let result = state.handle_isolated(request.request_id, request.method);
					if request.reply.send(result).is_err() {
						trace!("caller of request {} is gone", request.request_id);
					}
				}
				debug!("worker {worker} stopped");
			})
			.with_context(|| format!("Failed to spawn worker {worker}"))?;

		Ok(Worker {
			sender: Some(sender),
			handle: Some(handle),
		})
	}

	pub fn send(&self, request: Request) -> Result<(), Request> {
		match &self.sender {
			Some(sender) => sender.send(request).map_err(|error| error.0),
			None => Err(request),
		}
	}

	/// Closes the queue and waits until all queued requests are answered.
	pub fn join(&mut self) {
		self.sender = None;
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				warn!("a worker thread panicked");
			}
		}
	}
}
