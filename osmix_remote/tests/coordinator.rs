//! End-to-end tests of the worker pool: datasets are encoded to PBF in-process and loaded
//! through the coordinator.

use anyhow::Result;
use futures::future::join_all;
use osmix_core::{
	Blob, TileCoord,
	io::{ValueWriter, ValueWriterBlob},
};
use osmix_geometry::vector_tile::VectorTile;
use osmix_osm::{
	ChangeType, EntityKind, EntityStore, OsmChange, OsmChanges, OsmEntity, OsmHeader, OsmNode, OsmWay, OsmixError,
	Tags,
	pbf::{BLOB_TYPE_DATA, PbfWriter, PrimitiveBlock},
};
use osmix_remote::{Event, RemoteCoordinator};
use osmix_vt::{TileEncoderStrategy, TileSource};
use pretty_assertions::assert_eq;
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

/// A closed park ring with a fountain in the middle, near Nice.
fn park() -> Result<Blob> {
	let mut store = EntityStore::default();
	let corners = [[7.26, 43.69], [7.27, 43.69], [7.27, 43.70], [7.26, 43.70]];
	for (i, [lon, lat]) in corners.into_iter().enumerate() {
		store.create(OsmNode::new(i as i64 + 1, lon, lat))?;
	}
	store.create(OsmWay::new(10, vec![1, 2, 3, 4, 1]).with_tags(Tags::from(vec![("leisure", "park")])))?;
	store.create(
		OsmNode::new(5, 7.265, 43.695).with_tags(Tags::from(vec![("amenity", "fountain"), ("name", "Fontaine")])),
	)?;
	store.to_pbf()
}

/// A grid large enough that decoding it takes a while.
fn grid(size: i64) -> Result<Blob> {
	let mut store = EntityStore::default();
	for x in 0..size {
		for y in 0..size {
			store.create(OsmNode::new(x * size + y + 1, 7.4 + x as f64 * 1e-4, 43.7 + y as f64 * 1e-4))?;
		}
	}
	store.to_pbf()
}

/// A PBF whose only data block declares a granularity of 1e12 nanodegrees.
fn hostile() -> Result<Blob> {
	let mut block = PrimitiveBlock::default();
	block.nodes.push(OsmNode::new(1, 7.26, 43.69));
	let mut payload = ValueWriterBlob::new_le();
	payload.write_blob(&block.encode()?)?;
	payload.write_pbf_varint_field(17, 1_000_000_000_000)?;

	// uncompressed Blob and its BlobHeader
	let mut blob = ValueWriterBlob::new_le();
	blob.write_pbf_key(1, 2)?;
	blob.write_pbf_blob(&payload.into_blob())?;
	let blob = blob.into_blob();
	let mut header = ValueWriterBlob::new_le();
	header.write_pbf_key(1, 2)?;
	header.write_pbf_string(BLOB_TYPE_DATA)?;
	header.write_pbf_varint_field(3, blob.len())?;
	let header = header.into_blob();

	let mut file = ValueWriterBlob::new_be();
	file.write_blob(&PbfWriter::new(&OsmHeader::default())?.finish()?)?;
	file.write_u32(u32::try_from(header.len())?)?;
	file.write_blob(&header)?;
	file.write_blob(&blob)?;
	Ok(file.into_blob())
}

struct Exploding;

impl TileEncoderStrategy for Exploding {
	fn get_tile(&mut self, _source: &TileSource<'_>, coord: &TileCoord) -> Result<Blob> {
		panic!("encoder exploded on {coord}");
	}
}

fn park_tile() -> Result<TileCoord> {
	TileCoord::from_geo(7.265, 43.695, 13)
}

fn layer_names(blob: &Blob) -> Result<Vec<String>> {
	let tile = VectorTile::from_blob(blob)?;
	Ok(tile.layers.iter().map(|layer| layer.name.clone()).collect())
}

fn coordinator() -> Result<RemoteCoordinator> {
	RemoteCoordinator::builder().workers(2).silent().build()
}

#[tokio::test]
async fn concurrent_loads_share_one_ingest() -> Result<()> {
	let coordinator = coordinator()?;
	let ingests = Arc::new(AtomicUsize::new(0));
	let counter = ingests.clone();
	coordinator.events().subscribe(move |event| {
		if matches!(event, Event::Step { message } if message.starts_with("ingesting")) {
			counter.fetch_add(1, Ordering::SeqCst);
		}
	});

	let data = park()?;
	let infos = join_all((0..5).map(|_| coordinator.load("park", data.clone()))).await;
	let infos = infos.into_iter().collect::<Result<Vec<_>>>()?;

	assert_eq!(ingests.load(Ordering::SeqCst), 1);
	assert!(infos.iter().all(|info| info == &infos[0]));
	assert_eq!(infos[0].stats.nodes, 5);
	assert_eq!(infos[0].stats.ways, 1);
	assert!(coordinator.is_ready("park")?);
	assert_eq!(coordinator.datasets(), vec!["park".to_string()]);

	// loading a known id again joins the finished load
	let again = coordinator.load("park", Blob::new_empty()).await?;
	assert_eq!(again, infos[0]);
	assert_eq!(ingests.load(Ordering::SeqCst), 1);
	coordinator.shutdown();
	Ok(())
}

#[tokio::test]
async fn unknown_datasets_are_not_found() -> Result<()> {
	let coordinator = coordinator()?;
	for error in [
		coordinator.is_ready("nowhere").unwrap_err(),
		coordinator.get("nowhere").await.unwrap_err(),
		coordinator.delete("nowhere").await.unwrap_err(),
	] {
		assert_eq!(
			OsmixError::find(&error),
			Some(&OsmixError::DatasetNotFound("nowhere".into()))
		);
	}
	Ok(())
}

#[tokio::test]
async fn queries_on_a_loaded_dataset() -> Result<()> {
	let coordinator = coordinator()?;
	coordinator.load("park", park()?).await?;

	let found = coordinator.search("park", "amenity", Some("fountain")).await?;
	assert_eq!(found.len(), 1);
	assert_eq!(found[0].id(), 5);
	assert!(coordinator.search("park", "amenity", Some("bench")).await?.is_empty());

	let way = coordinator.get_entity("park", EntityKind::Way, 10).await?;
	match way {
		OsmEntity::Way(way) => assert_eq!(way.refs, vec![1, 2, 3, 4, 1]),
		other => panic!("expected a way, got {other:?}"),
	}
	let missing = coordinator.get_entity("park", EntityKind::Node, 99).await.unwrap_err();
	assert!(OsmixError::find(&missing).is_some_and(OsmixError::is_not_found));

	let nearby = coordinator.nearest("park", [7.2651, 43.6951], 1, None).await?;
	assert_eq!(nearby.len(), 1);
	assert_eq!(nearby[0].entity.id(), 5);
	assert!(nearby[0].distance < 20.0);
	assert!(coordinator.nearest("park", [0.0, 0.0], 3, Some(100.0)).await?.is_empty());
	Ok(())
}

#[tokio::test]
async fn tiles_follow_edits() -> Result<()> {
	let coordinator = coordinator()?;
	coordinator.load("park", park()?).await?;

	let tile = coordinator.get_tile("park", park_tile()?).await?;
	assert_eq!(layer_names(&tile)?, vec!["nodes", "ways"]);
	assert!(coordinator.get_tile("park", TileCoord::new(13, 0, 0)?).await?.is_empty());

	let mut changes = OsmChanges::default();
	changes.nodes.insert(
		5,
		OsmChange {
			change_type: ChangeType::Delete,
			entity: OsmNode::new(5, 7.265, 43.695),
			previous: None,
		},
	);
	let info = coordinator.edit("park", changes).await?;
	assert_eq!(info.stats.nodes, 4);

	let tile = coordinator.get_tile("park", park_tile()?).await?;
	assert_eq!(layer_names(&tile)?, vec!["ways"]);
	Ok(())
}

#[tokio::test]
async fn failed_edits_leave_the_dataset_unchanged() -> Result<()> {
	let coordinator = coordinator()?;
	let before = coordinator.load("park", park()?).await?;

	let mut changes = OsmChanges::default();
	changes.nodes.insert(
		6,
		OsmChange {
			change_type: ChangeType::Create,
			entity: OsmNode::new(6, 7.261, 43.691),
			previous: None,
		},
	);
	changes.ways.insert(
		10,
		OsmChange {
			change_type: ChangeType::Create,
			entity: OsmWay::new(10, vec![1, 2]),
			previous: None,
		},
	);
	let error = coordinator.edit("park", changes).await.unwrap_err();
	assert_eq!(
		OsmixError::find(&error),
		Some(&OsmixError::EntityExists {
			kind: EntityKind::Way,
			id: 10
		})
	);
	assert_eq!(coordinator.get("park").await?, before);
	Ok(())
}

#[tokio::test]
async fn deleted_datasets_are_gone() -> Result<()> {
	let coordinator = coordinator()?;
	coordinator.load("park", park()?).await?;
	coordinator.delete("park").await?;

	assert!(coordinator.datasets().is_empty());
	let error = coordinator.get_tile("park", park_tile()?).await.unwrap_err();
	assert!(OsmixError::find(&error).is_some_and(OsmixError::is_not_found));

	// the id can be reused
	coordinator.load("park", park()?).await?;
	assert!(coordinator.is_ready("park")?);
	Ok(())
}

#[tokio::test]
async fn failed_loads_are_unregistered() -> Result<()> {
	let coordinator = coordinator()?;
	let error = coordinator
		.load("broken", Blob::from(vec![0, 0, 0, 9, 1, 2, 3, 4, 5, 6, 7, 8, 9]))
		.await
		.unwrap_err();
	assert!(matches!(OsmixError::find(&error), Some(OsmixError::Parse(_))));
	assert!(coordinator.datasets().is_empty());
	assert!(coordinator.is_ready("broken").is_err());

	coordinator.load("broken", park()?).await?;
	assert!(coordinator.is_ready("broken")?);
	Ok(())
}

#[tokio::test]
async fn hostile_load_leaves_siblings_on_the_worker_alone() -> Result<()> {
	let coordinator = RemoteCoordinator::builder().workers(1).silent().build()?;
	coordinator.load("good", park()?).await?;

	let error = coordinator.load("hostile", hostile()?).await.unwrap_err();
	assert!(matches!(OsmixError::find(&error), Some(OsmixError::Parse(_))));
	assert!(format!("{error:#}").contains("invalid granularity"), "{error:#}");

	assert_eq!(coordinator.datasets(), vec!["good".to_string()]);
	assert_eq!(coordinator.get("good").await?.stats.nodes, 5);
	let error = coordinator.get("hostile").await.unwrap_err();
	assert_eq!(
		OsmixError::find(&error),
		Some(&OsmixError::DatasetNotFound("hostile".into()))
	);
	Ok(())
}

#[tokio::test]
async fn panicking_request_leaves_the_worker_running() -> Result<()> {
	let coordinator = RemoteCoordinator::builder()
		.workers(1)
		.silent()
		.tile_strategy(|_, _| -> Box<dyn TileEncoderStrategy> { Box::new(Exploding) })
		.build()?;
	coordinator.load("good", park()?).await?;
	coordinator.load("other", grid(3)?).await?;

	let error = coordinator.get_tile("good", park_tile()?).await.unwrap_err();
	assert!(format!("{error:#}").contains("encoder exploded"), "{error:#}");

	assert_eq!(coordinator.get("good").await?.stats.nodes, 5);
	assert_eq!(coordinator.get("other").await?.stats.nodes, 9);
	assert!(matches!(
		coordinator.get_entity("good", EntityKind::Way, 10).await?,
		OsmEntity::Way(_)
	));
	// the encoder is rebuilt and fails again without taking the worker down
	assert!(coordinator.get_tile("good", park_tile()?).await.is_err());
	assert!(coordinator.is_ready("other")?);
	Ok(())
}

#[tokio::test]
async fn slow_calls_time_out() -> Result<()> {
	let coordinator = RemoteCoordinator::builder()
		.workers(1)
		.silent()
		.call_timeout(Duration::from_nanos(1))
		.build()?;

	let error = coordinator.load("grid", grid(200)?).await.unwrap_err();
	assert!(matches!(OsmixError::find(&error), Some(OsmixError::Timeout(_))));

	// the load keeps running for everyone else
	assert_eq!(coordinator.datasets(), vec!["grid".to_string()]);
	let mut ready = false;
	for _ in 0..1000 {
		if coordinator.is_ready("grid")? {
			ready = true;
			break;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	assert!(ready);
	Ok(())
}

#[tokio::test]
async fn progress_is_reported_per_block() -> Result<()> {
	let coordinator = coordinator()?;
	let progress = Arc::new(AtomicUsize::new(0));
	let counter = progress.clone();
	coordinator.events().subscribe(move |event| {
		if matches!(event, Event::Progress(progress) if progress.dataset == "grid") {
			counter.fetch_add(1, Ordering::SeqCst);
		}
	});
	coordinator.load("grid", grid(100)?).await?;
	assert_eq!(progress.load(Ordering::SeqCst), 2);
	Ok(())
}
