pub mod convert;
pub mod diff;
pub mod nearest;
pub mod probe;
pub mod search;
pub mod tile;

use crate::config::Config;
use anyhow::{Context, Result};
use itertools::Itertools;
use osmix_core::Blob;
use osmix_osm::OsmEntity;
use osmix_remote::{RemoteConfig, RemoteCoordinator};
use std::path::Path;

pub fn read_blob(path: &Path) -> Result<Blob> {
	let data = std::fs::read(path).with_context(|| format!("Failed to read {path:?}"))?;
	Ok(Blob::from(data))
}

pub fn write_blob(path: &Path, blob: &Blob) -> Result<()> {
	std::fs::write(path, blob.as_slice()).with_context(|| format!("Failed to write {path:?}"))
}

/// Dataset id of a file: its name without extensions.
pub fn dataset_id(path: &Path) -> String {
	let name = path.file_name().map_or_else(|| "dataset".into(), |name| name.to_string_lossy());
	match name.split_once('.') {
		Some((stem, _)) if !stem.is_empty() => stem.to_string(),
		_ => name.to_string(),
	}
}

/// Starts a worker pool and loads `path` into it.
pub async fn open(path: &Path, config: RemoteConfig) -> Result<(RemoteCoordinator, String)> {
	let coordinator = RemoteCoordinator::builder().config(config).build()?;
	let id = dataset_id(path);
	coordinator
		.load(&id, read_blob(path)?)
		.await
		.with_context(|| format!("Failed to load {path:?}"))?;
	Ok((coordinator, id))
}

pub fn describe(entity: &OsmEntity) -> String {
	let tags = entity.tags().iter().map(|(key, value)| format!("{key}={value}")).join(" ");
	if tags.is_empty() {
		format!("{} {}", entity.kind(), entity.id())
	} else {
		format!("{} {} {tags}", entity.kind(), entity.id())
	}
}
