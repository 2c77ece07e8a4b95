mod config;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use config::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// YAML configuration file
	#[arg(long, short, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	/// number of worker threads
	#[arg(long, global = true, value_name = "int")]
	workers: Option<usize>,

	#[command(flatten)]
	verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Show header, entity counts, bounding box and validation issues of a PBF file
	Probe(tools::probe::Subcommand),

	/// List the entities carrying a tag
	Search(tools::search::Subcommand),

	#[clap(alias = "mvt")]
	/// Encode one vector tile
	Tile(tools::tile::Subcommand),

	/// Find the entities closest to a point
	Nearest(tools::nearest::Subcommand),

	/// Compare two PBF files
	Diff(tools::diff::Subcommand),

	/// Decode a PBF file and write it again
	Convert(tools::convert::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	let mut config = Config::load(cli.config.as_deref())?;
	config.override_optional_workers(cli.workers);

	match &cli.command {
		Commands::Probe(arguments) => tools::probe::run(arguments),
		Commands::Search(arguments) => tools::search::run(arguments, &config),
		Commands::Tile(arguments) => tools::tile::run(arguments, &config),
		Commands::Nearest(arguments) => tools::nearest::run(arguments, &config),
		Commands::Diff(arguments) => tools::diff::run(arguments),
		Commands::Convert(arguments) => tools::convert::run(arguments),
	}
}
