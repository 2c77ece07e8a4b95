//! Runs the `osmix` binary against PBF files generated in a temporary directory.

use anyhow::Result;
use assert_cmd::{Command, cargo};
use osmix_core::{Blob, TileCoord};
use osmix_geometry::vector_tile::VectorTile;
use osmix_osm::{EntityKind, EntityStore, OsmNode, OsmRelation, OsmWay, RelationMember, Tags};
use predicates::str::contains;
use rstest::rstest;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn osmix() -> Command {
	Command::new(cargo::cargo_bin!("osmix"))
}

/// A harbour quay with a bench, a ferry route and a broken relation, around Villefranche.
fn harbour() -> Result<EntityStore> {
	let mut store = EntityStore::default();
	let quay = [[7.310, 43.702], [7.312, 43.702], [7.312, 43.704], [7.310, 43.704]];
	for (i, [lon, lat]) in quay.into_iter().enumerate() {
		store.create(OsmNode::new(i as i64 + 1, lon, lat))?;
	}
	store.create(
		OsmNode::new(5, 7.311, 43.703).with_tags(Tags::from(vec![("amenity", "bench"), ("name", "Quai")])),
	)?;
	store.create(OsmWay::new(10, vec![1, 2, 3, 4, 1]).with_tags(Tags::from(vec![("man_made", "pier")])))?;
	store.create(OsmWay::new(11, vec![2, 3]).with_tags(Tags::from(vec![("highway", "footway")])))?;
	store.create(
		OsmRelation::new(20, vec![RelationMember::new(EntityKind::Way, 11, "")])
			.with_tags(Tags::from(vec![("type", "route"), ("route", "ferry")])),
	)?;
	store.create(
		OsmRelation::new(21, vec![RelationMember::new(EntityKind::Way, 99, "outer")])
			.with_tags(Tags::from(vec![("type", "multipolygon")])),
	)?;
	Ok(store)
}

fn write(dir: &TempDir, name: &str, store: &EntityStore) -> Result<PathBuf> {
	let path = dir.path().join(name);
	std::fs::write(&path, store.to_pbf()?.as_slice())?;
	Ok(path)
}

fn arg(path: &Path) -> &str {
	path.to_str().unwrap_or_default()
}

#[test]
fn no_command() {
	osmix()
		.assert()
		.failure()
		.code(2)
		.stderr(contains("Usage: osmix [OPTIONS] <COMMAND>"));
}

#[rstest]
#[case("probe", "<FILENAME>")]
#[case("search", "<FILENAME> <KEY[=VALUE]>")]
#[case("tile", "<FILENAME> <Z/X/Y>")]
#[case("nearest", "<FILENAME> <LON> <LAT>")]
#[case("diff", "<BASE> <PATCH>")]
#[case("convert", "<INPUT_FILE> <OUTPUT_FILE>")]
fn subcommand_usage(#[case] name: &str, #[case] usage: &str) {
	osmix().arg(name).assert().failure().code(2).stderr(contains(usage));
}

#[test]
fn probe() -> Result<()> {
	let dir = tempfile::tempdir()?;
	let path = write(&dir, "harbour.osm.pbf", &harbour()?)?;
	osmix()
		.args(["probe", arg(&path)])
		.assert()
		.success()
		.stdout(contains("nodes: 5"))
		.stdout(contains("ways: 2"))
		.stdout(contains("relations: 2"))
		.stdout(contains("bbox: [7.3100000, 43.7020000, 7.3120000, 43.7040000]"))
		.stdout(contains("incomplete entities: 1"))
		.stdout(contains("relation 21 references missing way 99"));
	Ok(())
}

#[test]
fn search() -> Result<()> {
	let dir = tempfile::tempdir()?;
	let path = write(&dir, "harbour.pbf", &harbour()?)?;
	osmix()
		.args(["search", arg(&path), "amenity=bench", "--workers", "1"])
		.assert()
		.success()
		.stdout("node 5 amenity=bench name=Quai\n");
	osmix()
		.args(["search", arg(&path), "type"])
		.assert()
		.success()
		.stdout(contains("relation 20 route=ferry type=route"))
		.stdout(contains("relation 21 type=multipolygon"));
	Ok(())
}

#[test]
fn tile() -> Result<()> {
	let dir = tempfile::tempdir()?;
	let path = write(&dir, "harbour.pbf", &harbour()?)?;
	let output = dir.path().join("harbour.mvt");
	let coord = TileCoord::from_geo(7.311, 43.703, 15)?.to_string();
	osmix()
		.args(["tile", arg(&path), coord.as_str(), "-o", arg(&output)])
		.assert()
		.success();

	let tile = VectorTile::from_blob(&Blob::from(std::fs::read(&output)?))?;
	assert!(tile.find_layer("nodes").is_some());
	assert!(tile.find_layer("ways").is_some());
	Ok(())
}

#[test]
fn nearest() -> Result<()> {
	let dir = tempfile::tempdir()?;
	let path = write(&dir, "harbour.pbf", &harbour()?)?;
	osmix()
		.args(["nearest", arg(&path), "7.3111", "43.7031", "-k", "1"])
		.assert()
		.success()
		.stdout(contains("node 5 amenity=bench"));
	osmix()
		.args(["nearest", arg(&path), "-7.0", "43.7", "-k", "2"])
		.assert()
		.success()
		.stdout(contains("node"));
	osmix()
		.args(["nearest", arg(&path), "0", "0", "--max-distance", "100"])
		.assert()
		.success()
		.stdout("")
		.stderr(contains("nothing found"));
	Ok(())
}

#[test]
fn diff_and_convert() -> Result<()> {
	let dir = tempfile::tempdir()?;
	let base = harbour()?;
	let mut patch = base.clone();
	patch.delete(EntityKind::Relation, 21)?;
	patch.modify(OsmNode::new(5, 7.3115, 43.703).with_tags(Tags::from(vec![("amenity", "bench")])))?;
	let base_path = write(&dir, "base.pbf", &base)?;
	let patch_path = write(&dir, "patch.pbf", &patch)?;

	osmix()
		.args(["diff", arg(&base_path), arg(&patch_path), "--list"])
		.assert()
		.success()
		.stdout(contains("nodes: 0 created, 1 modified, 0 deleted"))
		.stdout(contains("relations: 0 created, 0 modified, 1 deleted"))
		.stdout(contains("~ node 5"))
		.stdout(contains("- relation 21"));

	let converted = dir.path().join("converted.pbf");
	osmix()
		.args(["convert", arg(&patch_path), arg(&converted)])
		.assert()
		.success();
	osmix()
		.args(["diff", arg(&patch_path), arg(&converted)])
		.assert()
		.success()
		.stderr(contains("no differences"));
	Ok(())
}

#[test]
fn config_file() -> Result<()> {
	let dir = tempfile::tempdir()?;
	let path = write(&dir, "harbour.pbf", &harbour()?)?;
	let output = dir.path().join("harbour.mvt");
	let config = dir.path().join("osmix.yml");
	std::fs::write(&config, "workers: 1\ntile:\n  profile: shortbread\n")?;
	let coord = TileCoord::from_geo(7.311, 43.703, 15)?.to_string();

	osmix()
		.args(["--config", arg(&config), "tile", arg(&path), coord.as_str(), "-o", arg(&output)])
		.assert()
		.success();
	let tile = VectorTile::from_blob(&Blob::from(std::fs::read(&output)?))?;
	assert!(tile.find_layer("pois").is_some());
	assert!(tile.find_layer("nodes").is_none());

	std::fs::write(&config, "threads: 1\n")?;
	osmix()
		.args(["--config", arg(&config), "probe", arg(&path)])
		.assert()
		.failure()
		.stderr(contains("Failed to parse config file"));
	Ok(())
}

#[test]
fn missing_file() {
	osmix()
		.args(["probe", "/does/not/exist.pbf"])
		.assert()
		.failure()
		.stderr(contains("Failed to read"));
}
