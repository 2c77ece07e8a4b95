//! Messages between the coordinator and its workers.
//!
//! Every [`Request`] carries its own reply channel. Bulk buffers move: the PBF [`Blob`] of a
//! load is handed to the worker, and the tile [`Blob`] is handed back. Entities are returned
//! as copies; the store itself never leaves its worker.

use anyhow::Result;
use osmix_core::{Blob, GeoBBox, TileCoord};
use osmix_osm::{EntityKind, OsmChanges, OsmEntity, OsmHeader, StoreStats};
use tokio::sync::oneshot;

/// Summary of a loaded dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetInfo {
	pub id: String,
	pub worker: usize,
	pub header: OsmHeader,
	pub stats: StoreStats,
	pub bbox: Option<GeoBBox>,
	/// Ways and relations with unresolved references.
	pub incomplete: usize,
}

/// An entity found by [`RemoteCoordinator::nearest`](crate::RemoteCoordinator::nearest);
/// `distance` is in meters.
#[derive(Clone, Debug, PartialEq)]
pub struct Nearby {
	pub entity: OsmEntity,
	pub distance: f64,
}

#[derive(Debug)]
pub enum Method {
	Load {
		dataset: String,
		data: Blob,
	},
	Info {
		dataset: String,
	},
	Entity {
		dataset: String,
		kind: EntityKind,
		id: i64,
	},
	Search {
		dataset: String,
		key: String,
		value: Option<String>,
	},
	Tile {
		dataset: String,
		coord: TileCoord,
	},
	Nearest {
		dataset: String,
		point: [f64; 2],
		k: usize,
		max_distance: Option<f64>,
	},
	Edit {
		dataset: String,
		changes: OsmChanges,
	},
	Delete {
		dataset: String,
	},
}

impl Method {
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			Method::Load { .. } => "load",
			Method::Info { .. } => "info",
			Method::Entity { .. } => "entity",
			Method::Search { .. } => "search",
			Method::Tile { .. } => "tile",
			Method::Nearest { .. } => "nearest",
			Method::Edit { .. } => "edit",
			Method::Delete { .. } => "delete",
		}
	}

	#[must_use]
	pub fn dataset(&self) -> &str {
		match self {
			Method::Load { dataset, .. }
			| Method::Info { dataset }
			| Method::Entity { dataset, .. }
			| Method::Search { dataset, .. }
			| Method::Tile { dataset, .. }
			| Method::Nearest { dataset, .. }
			| Method::Edit { dataset, .. }
			| Method::Delete { dataset } => dataset,
		}
	}
}

#[derive(Debug)]
pub enum Response {
	Info(DatasetInfo),
	Entity(OsmEntity),
	Entities(Vec<OsmEntity>),
	Tile(Blob),
	Nearest(Vec<Nearby>),
	Done,
}

/// A call to one worker, answered exactly once through `reply`.
#[derive(Debug)]
pub struct Request {
	pub request_id: u64,
	pub method: Method,
	pub reply: oneshot::Sender<Result<Response>>,
}
