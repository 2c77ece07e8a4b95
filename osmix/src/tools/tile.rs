use super::{open, write_blob};
use crate::config::Config;
use anyhow::{Context, Result};
use osmix_core::TileCoord;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// OSM PBF file
	#[arg(required = true)]
	filename: PathBuf,

	/// tile coordinate as z/x/y
	#[arg(required = true, value_name = "Z/X/Y")]
	coord: TileCoord,

	/// output file for the Mapbox Vector Tile
	#[arg(long, short, required = true, value_name = "FILE")]
	output: PathBuf,

	/// layer schema: default or shortbread
	#[arg(long, short, value_name = "PROFILE")]
	profile: Option<String>,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand, config: &Config) -> Result<()> {
	let mut config = config.clone();
	config.tile.override_optional_profile(arguments.profile.as_deref());

	let (coordinator, id) = open(&arguments.filename, config.to_remote_config()?).await?;
	let tile = coordinator
		.get_tile(&id, arguments.coord)
		.await
		.with_context(|| format!("Failed to encode tile {}", arguments.coord))?;
	write_blob(&arguments.output, &tile)?;

	if tile.is_empty() {
		eprintln!("tile {} is empty", arguments.coord);
	} else {
		eprintln!("wrote {} bytes to {}", tile.len(), arguments.output.display());
	}
	coordinator.shutdown();
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tests::{park, run_command, write_pbf};
	use anyhow::Result;
	use osmix_core::{Blob, TileCoord};
	use osmix_geometry::vector_tile::VectorTile;
	use rstest::rstest;

	#[rstest]
	#[case(&[], &["nodes", "ways"])]
	#[case(&["--profile", "shortbread"], &["land", "pois"])]
	fn tile_file(#[case] extra: &[&str], #[case] layers: &[&str]) -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = write_pbf(dir.path(), "park.pbf", &park()?)?;
		let output = dir.path().join("tile.mvt");
		let coord = TileCoord::from_geo(7.265, 43.695, 13)?.to_string();

		let mut args = vec![
			"osmix",
			"tile",
			path.to_str().unwrap_or_default(),
			coord.as_str(),
			"-o",
			output.to_str().unwrap_or_default(),
		];
		args.extend_from_slice(extra);
		run_command(args)?;

		let tile = VectorTile::from_blob(&Blob::from(std::fs::read(&output)?))?;
		let names: Vec<&str> = tile.layers.iter().map(|layer| layer.name.as_str()).collect();
		assert_eq!(names, layers);
		Ok(())
	}

	#[test]
	fn invalid_coordinate() {
		assert!(run_command(vec!["osmix", "tile", "park.pbf", "3/9/0", "-o", "x.mvt"]).is_err());
		assert!(run_command(vec!["osmix", "tile", "park.pbf", "banana", "-o", "x.mvt"]).is_err());
	}
}
