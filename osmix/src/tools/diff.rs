use super::read_blob;
use anyhow::{Context, Result};
use osmix_osm::{ChangeType, EntityKind, EntityStore, OsmChange, diff};
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// the older PBF file
	#[arg(required = true)]
	base: PathBuf,

	/// the newer PBF file
	#[arg(required = true)]
	patch: PathBuf,

	/// list every changed entity
	#[arg(long, short)]
	list: bool,
}

fn decode(path: &Path) -> Result<EntityStore> {
	EntityStore::from_pbf(&read_blob(path)?).with_context(|| format!("Failed to decode {path:?}"))
}

fn print_changes<T>(kind: EntityKind, changes: &BTreeMap<i64, OsmChange<T>>) {
	for (id, change) in changes {
		let sign = match change.change_type {
			ChangeType::Create => '+',
			ChangeType::Modify => '~',
			ChangeType::Delete => '-',
		};
		println!("{sign} {kind} {id}");
	}
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let base = decode(&arguments.base)?;
	let patch = decode(&arguments.patch)?;
	let changes = diff::diff(&base, &patch);

	for kind in [EntityKind::Node, EntityKind::Way, EntityKind::Relation] {
		println!("{kind}s: {}", changes.stats(kind));
	}
	if arguments.list {
		print_changes(EntityKind::Node, &changes.nodes);
		print_changes(EntityKind::Way, &changes.ways);
		print_changes(EntityKind::Relation, &changes.relations);
	}
	if changes.is_empty() {
		eprintln!("no differences");
	}
	Ok(())
}
