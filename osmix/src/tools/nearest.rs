use super::{describe, open};
use crate::config::Config;
use anyhow::{Result, ensure};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// OSM PBF file
	#[arg(required = true)]
	filename: PathBuf,

	/// longitude in degrees
	#[arg(required = true, allow_negative_numbers = true)]
	lon: f64,

	/// latitude in degrees
	#[arg(required = true, allow_negative_numbers = true)]
	lat: f64,

	/// number of entities to return
	#[arg(short, value_name = "int", default_value_t = 5)]
	k: usize,

	/// ignore entities farther away than this many meters
	#[arg(long, value_name = "meters")]
	max_distance: Option<f64>,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand, config: &Config) -> Result<()> {
	ensure!(
		(-180.0..=180.0).contains(&arguments.lon) && (-90.0..=90.0).contains(&arguments.lat),
		"position {}, {} is outside the valid range",
		arguments.lon,
		arguments.lat
	);

	let (coordinator, id) = open(&arguments.filename, config.to_remote_config()?).await?;
	let nearby = coordinator
		.nearest(&id, [arguments.lon, arguments.lat], arguments.k, arguments.max_distance)
		.await?;

	if nearby.is_empty() {
		eprintln!("nothing found");
	}
	for found in &nearby {
		println!("{:.1} m\t{}", found.distance, describe(&found.entity));
	}
	coordinator.shutdown();
	Ok(())
}
