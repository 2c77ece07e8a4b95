//! The caller side of the worker pool.
//!
//! The coordinator keeps a registry from dataset id to the worker that owns it. A dataset is
//! registered the moment its load is dispatched, so every later call for that id is queued
//! behind the load on the same worker. Concurrent loads of one id share a single in-flight
//! ingest.

use crate::{
	EventBus, RemoteConfig, RuntimeBuilder,
	protocol::{DatasetInfo, Method, Nearby, Request, Response},
	worker::{Worker, WorkerSettings},
};
use anyhow::{Result, anyhow, ensure};
use futures::{
	FutureExt,
	future::{BoxFuture, Shared},
};
use log::{debug, trace};
use osmix_core::{Blob, TileCoord};
use osmix_osm::{EntityKind, OsmChanges, OsmEntity, OsmixError};
use osmix_vt::{TileEncoderStrategy, TileConfig};
use parking_lot::Mutex;
use std::{
	collections::HashMap,
	future::Future,
	sync::{
		Arc,
		atomic::{AtomicU64, AtomicUsize, Ordering},
	},
	time::Duration,
};
use tokio::sync::oneshot;

/// Creates the tile strategy of a dataset from the tile settings and cache budget.
pub type StrategyFactory = Arc<dyn Fn(&TileConfig, usize) -> Box<dyn TileEncoderStrategy> + Send + Sync>;

type LoadFuture = Shared<BoxFuture<'static, Result<DatasetInfo, Arc<anyhow::Error>>>>;

struct Registration {
	worker: usize,
	attempt: u64,
	load: LoadFuture,
}

/// Turns a shared load error back into an owned one with the same message chain, keeping
/// the typed cause in its place.
fn unshare(error: &anyhow::Error) -> anyhow::Error {
	let Some(typed) = OsmixError::find(error) else {
		return anyhow!("{error:#}");
	};
	let links: Vec<String> = error.chain().map(ToString::to_string).collect();
	let typed_text = typed.to_string();
	let position = links.iter().position(|link| *link == typed_text).unwrap_or(links.len() - 1);

	let below = &links[position + 1..];
	let mut copy = if below.is_empty() {
		anyhow::Error::new(typed.clone())
	} else {
		anyhow!("{}", below.join(": ")).context(typed.clone())
	};
	if position > 0 {
		copy = copy.context(links[..position].join(": "));
	}
	copy
}

fn dataset_not_found(id: &str) -> anyhow::Error {
	OsmixError::DatasetNotFound(id.to_string()).into()
}

fn unexpected(method: &str, response: &Response) -> anyhow::Error {
	anyhow!("unexpected response to {method}: {response:?}")
}

/// Owns the worker pool and routes calls to the worker that owns each dataset.
///
/// ```no_run
/// use osmix_core::{Blob, TileCoord};
/// use osmix_remote::RemoteCoordinator;
///
/// # async fn run(pbf: Blob) -> anyhow::Result<()> {
/// let coordinator = RemoteCoordinator::builder().workers(2).silent().build()?;
/// coordinator.load("monaco", pbf).await?;
/// let tile = coordinator.get_tile("monaco", TileCoord::new(14, 8529, 5975)?).await?;
/// println!("{} bytes", tile.len());
/// coordinator.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct RemoteCoordinator {
	workers: Vec<Worker>,
	registry: Mutex<HashMap<String, Registration>>,
	next_worker: AtomicUsize,
	next_request: AtomicU64,
	next_attempt: AtomicU64,
	events: EventBus,
	call_timeout: Option<Duration>,
}

impl RemoteCoordinator {
	#[must_use]
	pub fn builder() -> RuntimeBuilder {
		RuntimeBuilder::new()
	}

	pub(crate) fn start(config: &RemoteConfig, factory: StrategyFactory, events: EventBus) -> Result<Self> {
		ensure!(config.workers > 0, "at least one worker is required");
		let settings = WorkerSettings {
			tile: config.tile,
			index: config.index,
			tile_cache_size: config.tile_cache_size,
			factory,
			events: events.clone(),
		};
		let workers = (0..config.workers)
			.map(|worker| Worker::spawn(worker, settings.clone()))
			.collect::<Result<Vec<_>>>()?;
		debug!("started {} workers", workers.len());

		Ok(RemoteCoordinator {
			workers,
			registry: Mutex::new(HashMap::new()),
			next_worker: AtomicUsize::new(0),
			next_request: AtomicU64::new(0),
			next_attempt: AtomicU64::new(0),
			events,
			call_timeout: config.call_timeout,
		})
	}

	#[must_use]
	pub fn events(&self) -> &EventBus {
		&self.events
	}

	#[must_use]
	pub fn workers(&self) -> usize {
		self.workers.len()
	}

	/// Ids of all registered datasets, loaded or in flight, sorted.
	#[must_use]
	pub fn datasets(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.registry.lock().keys().cloned().collect();
		ids.sort();
		ids
	}

	/// Queues `method` on `worker` and returns the future of its reply.
	///
	/// The request is sent before this returns, so the work starts even if the future is
	/// never polled.
	fn dispatch(&self, worker: usize, method: Method) -> Result<impl Future<Output = Result<Response>> + Send + 'static> {
		let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
		let (reply, receiver) = oneshot::channel();
		trace!("request {request_id}: {} '{}' to worker {worker}", method.name(), method.dataset());
		let handle = self
			.workers
			.get(worker)
			.ok_or_else(|| OsmixError::WorkerUnavailable(format!("no worker {worker}")))?;
		handle
			.send(Request {
				request_id,
				method,
				reply,
			})
			.map_err(|_| OsmixError::WorkerUnavailable(format!("worker {worker} has stopped")))?;

		Ok(async move {
			match receiver.await {
				Ok(result) => result,
				Err(_) => Err(OsmixError::WorkerUnavailable(format!("worker {worker} dropped request {request_id}")).into()),
			}
		})
	}

	/// Awaits `future`, failing with [`OsmixError::Timeout`] after the call deadline.
	async fn deadline<T>(&self, what: String, future: impl Future<Output = T>) -> Result<T> {
		match self.call_timeout {
			Some(limit) => tokio::time::timeout(limit, future)
				.await
				.map_err(|_| OsmixError::Timeout(format!("{what} did not finish within {limit:?}")).into()),
			None => Ok(future.await),
		}
	}

	fn worker_of(&self, id: &str) -> Result<usize> {
		self
			.registry
			.lock()
			.get(id)
			.map(|registration| registration.worker)
			.ok_or_else(|| dataset_not_found(id))
	}

	/// Sends `method` to the worker owning `id` and waits for the reply.
	async fn call(&self, id: &str, method: Method) -> Result<Response> {
		let name = method.name();
		let reply = self.dispatch(self.worker_of(id)?, method)?;
		self.deadline(format!("{name} on '{id}'"), reply).await?
	}

	fn pick_worker(&self) -> usize {
		self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
	}

	/// Ingests a PBF file as dataset `id` on one of the workers.
	///
	/// While a load of `id` is in flight, further loads of `id` wait for it instead of parsing
	/// again, and so does a load of an id that is already loaded; their `data` is dropped.
	/// A failed load leaves `id` unregistered.
	pub async fn load(&self, id: &str, data: Blob) -> Result<DatasetInfo> {
		let (attempt, load) = {
			let mut registry = self.registry.lock();
			if let Some(registration) = registry.get(id) {
				debug!("load of '{id}' joins the ingest in flight");
				(registration.attempt, registration.load.clone())
			} else {
				let worker = self.pick_worker();
				let reply = self.dispatch(
					worker,
					Method::Load {
						dataset: id.to_string(),
						data,
					},
				)?;
				let load: LoadFuture = async move {
					match reply.await {
						Ok(Response::Info(info)) => Ok(info),
						Ok(other) => Err(Arc::new(unexpected("load", &other))),
						Err(error) => Err(Arc::new(error)),
					}
				}
				.boxed()
				.shared();
				let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
				registry.insert(
					id.to_string(),
					Registration {
						worker,
						attempt,
						load: load.clone(),
					},
				);
				(attempt, load)
			}
		};

		match self.deadline(format!("load of '{id}'"), load).await? {
			Ok(info) => Ok(info),
			Err(error) => {
				self.forget_failed(id, attempt);
				Err(unshare(&error))
			}
		}
	}

	fn forget_failed(&self, id: &str, attempt: u64) {
		let mut registry = self.registry.lock();
		if registry.get(id).is_some_and(|registration| registration.attempt == attempt) {
			registry.remove(id);
			debug!("'{id}' unregistered after a failed load");
		}
	}

	/// Whether the load of `id` has completed. Fails if `id` was never loaded or its load failed.
	pub fn is_ready(&self, id: &str) -> Result<bool> {
		let (attempt, load) = {
			let registry = self.registry.lock();
			let registration = registry.get(id).ok_or_else(|| dataset_not_found(id))?;
			(registration.attempt, registration.load.clone())
		};
		match load.now_or_never() {
			None => Ok(false),
			Some(Ok(_)) => Ok(true),
			Some(Err(error)) => {
				self.forget_failed(id, attempt);
				Err(unshare(&error).context(format!("load of '{id}' failed")))
			}
		}
	}

	/// Current summary of `id`, waiting for its load to finish.
	pub async fn get(&self, id: &str) -> Result<DatasetInfo> {
		match self.call(id, Method::Info { dataset: id.to_string() }).await? {
			Response::Info(info) => Ok(info),
			other => Err(unexpected("get", &other)),
		}
	}

	pub async fn get_entity(&self, id: &str, kind: EntityKind, entity_id: i64) -> Result<OsmEntity> {
		let method = Method::Entity {
			dataset: id.to_string(),
			kind,
			id: entity_id,
		};
		match self.call(id, method).await? {
			Response::Entity(entity) => Ok(entity),
			other => Err(unexpected("get_entity", &other)),
		}
	}

	/// Copies of all entities tagged `key` (with value `value`, if given), nodes first.
	pub async fn search(&self, id: &str, key: &str, value: Option<&str>) -> Result<Vec<OsmEntity>> {
		let method = Method::Search {
			dataset: id.to_string(),
			key: key.to_string(),
			value: value.map(str::to_string),
		};
		match self.call(id, method).await? {
			Response::Entities(entities) => Ok(entities),
			other => Err(unexpected("search", &other)),
		}
	}

	/// The encoded tile; empty when no feature intersects it.
	pub async fn get_tile(&self, id: &str, coord: TileCoord) -> Result<Blob> {
		match self.call(id, Method::Tile { dataset: id.to_string(), coord }).await? {
			Response::Tile(blob) => Ok(blob),
			other => Err(unexpected("get_tile", &other)),
		}
	}

	pub async fn nearest(&self, id: &str, point: [f64; 2], k: usize, max_distance: Option<f64>) -> Result<Vec<Nearby>> {
		let method = Method::Nearest {
			dataset: id.to_string(),
			point,
			k,
			max_distance,
		};
		match self.call(id, method).await? {
			Response::Nearest(nearby) => Ok(nearby),
			other => Err(unexpected("nearest", &other)),
		}
	}

	/// Applies a changeset to `id`. The spatial index is rebuilt and tile caches are dropped
	/// before any later call on `id` is served. A changeset that fails to apply leaves the
	/// dataset unchanged.
	pub async fn edit(&self, id: &str, changes: OsmChanges) -> Result<DatasetInfo> {
		let method = Method::Edit {
			dataset: id.to_string(),
			changes,
		};
		match self.call(id, method).await? {
			Response::Info(info) => Ok(info),
			other => Err(unexpected("edit", &other)),
		}
	}

	/// Unregisters `id` and drops its store, index and tile strategy on the owning worker.
	pub async fn delete(&self, id: &str) -> Result<()> {
		let worker = self
			.registry
			.lock()
			.remove(id)
			.map(|registration| registration.worker)
			.ok_or_else(|| dataset_not_found(id))?;
		let reply = self.dispatch(worker, Method::Delete { dataset: id.to_string() })?;
		match self.deadline(format!("delete of '{id}'"), reply).await? {
			Ok(Response::Done) => Ok(()),
			// a load that failed on the worker leaves nothing to delete
			Err(error) if OsmixError::find(&error).is_some_and(OsmixError::is_not_found) => Ok(()),
			Ok(other) => Err(unexpected("delete", &other)),
			Err(error) => Err(error),
		}
	}

	/// Stops all workers after they have answered their queued requests.
	pub fn shutdown(mut self) {
		self.stop();
	}

	fn stop(&mut self) {
		if self.workers.is_empty() {
			return;
		}
		for worker in &mut self.workers {
			worker.join();
		}
		debug!("stopped {} workers", self.workers.len());
		self.workers.clear();
	}
}

impl Drop for RemoteCoordinator {
	fn drop(&mut self) {
		self.stop();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unshare_keeps_the_root_cause() {
		let error = anyhow::Error::new(OsmixError::Parse("bad frame".into())).context("Failed to load dataset 'x'");
		let copy = unshare(&error);
		assert_eq!(OsmixError::find(&copy), Some(&OsmixError::Parse("bad frame".into())));
		assert_eq!(copy.to_string(), "Failed to load dataset 'x'");
		assert_eq!(format!("{copy:#}"), format!("{error:#}"));

		let bare = anyhow::Error::new(OsmixError::Parse("bad frame".into()));
		assert_eq!(format!("{:#}", unshare(&bare)), format!("{bare:#}"));
		assert_eq!(unshare(&bare).chain().count(), 1);

		let nested = anyhow!("invalid granularity 1000000000000")
			.context(OsmixError::Parse("block 0".into()))
			.context("Failed to decode PBF")
			.context("Failed to load dataset 'x'");
		let copy = unshare(&nested);
		assert_eq!(OsmixError::find(&copy), Some(&OsmixError::Parse("block 0".into())));
		assert_eq!(format!("{copy:#}"), format!("{nested:#}"));

		let plain = unshare(&anyhow!("boom"));
		assert_eq!(OsmixError::find(&plain), None);
		assert_eq!(plain.to_string(), "boom");
	}
}
