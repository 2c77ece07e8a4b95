use super::{describe, open};
use crate::config::Config;
use anyhow::Result;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// OSM PBF file
	#[arg(required = true)]
	filename: PathBuf,

	/// tag key, optionally with a value: `amenity` or `amenity=bench`
	#[arg(required = true, value_name = "KEY[=VALUE]")]
	tag: String,

	/// maximum number of entities to print
	#[arg(long, short, value_name = "int")]
	limit: Option<usize>,
}

fn split_tag(tag: &str) -> (&str, Option<&str>) {
	match tag.split_once('=') {
		Some((key, value)) => (key, Some(value)),
		None => (tag, None),
	}
}

#[tokio::main]
pub async fn run(arguments: &Subcommand, config: &Config) -> Result<()> {
	let (coordinator, id) = open(&arguments.filename, config.to_remote_config()?).await?;
	let (key, value) = split_tag(&arguments.tag);
	let entities = coordinator.search(&id, key, value).await?;

	eprintln!("{} entities match {}", entities.len(), arguments.tag);
	for entity in entities.iter().take(arguments.limit.unwrap_or(usize::MAX)) {
		println!("{}", describe(entity));
	}
	coordinator.shutdown();
	Ok(())
}
