use crate::EntityKind;
use thiserror::Error;

/// Typed root causes carried inside `anyhow::Error`.
///
/// Call sites return `anyhow::Result` and add context freely; callers that need to react to
/// a specific failure use `error.downcast_ref::<OsmixError>()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OsmixError {
	/// Malformed PBF framing or protobuf, out-of-range string table index, decompression failure.
	#[error("parse error: {0}")]
	Parse(String),

	#[error("{kind} {id} not found")]
	EntityNotFound { kind: EntityKind, id: i64 },

	#[error("{kind} {id} already exists")]
	EntityExists { kind: EntityKind, id: i64 },

	#[error("dataset '{0}' not found")]
	DatasetNotFound(String),

	#[error("spatial index was built for store generation {built}, but the store is at generation {current}")]
	StaleIndex { built: u64, current: u64 },

	#[error("call '{0}' timed out")]
	Timeout(String),

	#[error("worker unavailable: {0}")]
	WorkerUnavailable(String),
}

impl OsmixError {
	/// Finds an `OsmixError` anywhere in the chain of `error`.
	#[must_use]
	pub fn find(error: &anyhow::Error) -> Option<&OsmixError> {
		error
			.downcast_ref::<OsmixError>()
			.or_else(|| error.chain().find_map(|cause| cause.downcast_ref::<OsmixError>()))
	}

	/// True for any of the not-found variants.
	#[must_use]
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			OsmixError::EntityNotFound { .. } | OsmixError::DatasetNotFound(_)
		)
	}
}
