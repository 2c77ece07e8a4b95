use super::read_blob;
use anyhow::{Context, Result};
use log::debug;
use osmix_osm::EntityStore;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// OSM PBF file
	#[arg(required = true)]
	filename: PathBuf,

	/// maximum number of validation issues to list
	#[arg(long, value_name = "int", default_value_t = 20)]
	issues: usize,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let path = &arguments.filename;
	let blob = read_blob(path)?;
	let store = EntityStore::from_pbf_with_progress(&blob, &mut |message| debug!("{message}"))
		.with_context(|| format!("Failed to decode {path:?}"))?;

	println!("file: {}", path.display());
	println!("size: {} bytes", blob.len());

	let header = store.header();
	if let Some(program) = &header.writing_program {
		println!("writing program: {program}");
	}
	if let Some(source) = &header.source {
		println!("source: {source}");
	}
	if !header.required_features.is_empty() {
		println!("required features: {}", header.required_features.join(", "));
	}
	if let Some(bbox) = &header.bbox {
		println!(
			"header bbox: [{}, {}, {}, {}]",
			bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max
		);
	}

	let stats = store.stats();
	println!("nodes: {}", stats.nodes);
	println!("ways: {}", stats.ways);
	println!("relations: {}", stats.relations);
	match store.bbox_all() {
		Some(bbox) => println!(
			"bbox: [{:.7}, {:.7}, {:.7}, {:.7}]",
			bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max
		),
		None => println!("bbox: none"),
	}

	let report = store.validation();
	println!("incomplete entities: {}", report.len());
	for issue in report.issues().iter().take(arguments.issues) {
		println!("  {issue}");
	}
	if report.len() > arguments.issues {
		println!("  ... and {} more", report.len() - arguments.issues);
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::{park, run_command, write_pbf};
	use anyhow::Result;
	use osmix_osm::OsmWay;

	#[test]
	fn probe_file() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let mut store = park()?;
		store.create(OsmWay::new(11, vec![5, 99]))?;
		let path = write_pbf(dir.path(), "park.osm.pbf", &store)?;
		run_command(vec!["osmix", "probe", path.to_str().unwrap_or_default()])?;
		Ok(())
	}

	#[test]
	fn probe_garbage() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("garbage.pbf");
		std::fs::write(&path, b"not a pbf file")?;
		let error = run_command(vec!["osmix", "probe", path.to_str().unwrap_or_default()]).unwrap_err();
		assert!(format!("{error:#}").contains("Failed to decode"));
		Ok(())
	}
}
