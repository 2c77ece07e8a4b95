use super::{read_blob, write_blob};
use anyhow::{Context, Result};
use log::info;
use osmix_osm::EntityStore;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// OSM PBF file to read
	#[arg()]
	input_file: PathBuf,

	/// OSM PBF file to write
	#[arg()]
	output_file: PathBuf,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	eprintln!("convert from {:?} to {:?}", arguments.input_file, arguments.output_file);

	let input = read_blob(&arguments.input_file)?;
	let store = EntityStore::from_pbf(&input).with_context(|| format!("Failed to decode {:?}", arguments.input_file))?;
	let output = store.to_pbf()?;
	write_blob(&arguments.output_file, &output)?;

	let stats = store.stats();
	info!(
		"wrote {} nodes, {} ways and {} relations ({} bytes, was {} bytes)",
		stats.nodes,
		stats.ways,
		stats.relations,
		output.len(),
		input.len()
	);
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::{park, run_command, write_pbf};
	use anyhow::Result;
	use osmix_core::Blob;
	use osmix_osm::{EntityStore, diff};

	#[test]
	fn convert_file() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let store = park()?;
		let input = write_pbf(dir.path(), "in.pbf", &store)?;
		let output = dir.path().join("out.pbf");
		run_command(vec![
			"osmix",
			"convert",
			input.to_str().unwrap_or_default(),
			output.to_str().unwrap_or_default(),
		])?;

		let converted = EntityStore::from_pbf(&Blob::from(std::fs::read(&output)?))?;
		assert!(diff::diff(&store, &converted).is_empty());
		Ok(())
	}
}
