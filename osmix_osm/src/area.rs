//! Deciding whether a way describes an area or a line.
//!
//! Only a closed ring of at least four refs can be an area. On a closed ring an explicit
//! `area=no` or `area=yes` wins and an untagged ring is an area. Otherwise the polygon
//! feature table decides: keys marked `All` are areas for any value but `no`, `Whitelist` keys only
//! for the listed values, `Blacklist` keys for every value except the listed ones.

use crate::Tags;
use lazy_static::lazy_static;
use std::collections::HashMap;

enum PolygonRule {
	All,
	Whitelist(&'static [&'static str]),
	Blacklist(&'static [&'static str]),
}

lazy_static! {
	static ref POLYGON_FEATURES: HashMap<&'static str, PolygonRule> = {
		use PolygonRule::*;
		HashMap::from([
			("aeroway", Blacklist(&["taxiway"])),
			("amenity", All),
			("area", All),
			("area:highway", All),
			("barrier", Whitelist(&["city_wall", "ditch", "hedge", "retaining_wall", "wall", "spikes"])),
			("boundary", All),
			("building", All),
			("building:part", All),
			("craft", All),
			("golf", All),
			("highway", Whitelist(&["services", "rest_area", "escape", "elevator"])),
			("historic", All),
			("indoor", All),
			("landuse", All),
			("leisure", All),
			("man_made", Blacklist(&["cutline", "embankment", "pipeline"])),
			("military", All),
			("natural", Blacklist(&["coastline", "cliff", "ridge", "arete", "tree_row"])),
			("office", All),
			("place", All),
			("power", Whitelist(&["plant", "substation", "generator", "transformer"])),
			("public_transport", All),
			("railway", Whitelist(&["station", "turntable", "roundhouse", "platform"])),
			("ruins", All),
			("shop", All),
			("tourism", All),
			("waterway", Whitelist(&["riverbank", "dock", "boatyard", "dam"])),
		])
	};
}

/// True if the way with node `refs` and `tags` should be rendered as a polygon.
#[must_use]
pub fn way_is_area(refs: &[i64], tags: &Tags) -> bool {
	let closed = refs.len() >= 4 && refs.first() == refs.last();
	if !closed {
		return false;
	}
	match tags.get("area") {
		Some("no") => return false,
		Some(_) => return true,
		None => {}
	}
	if tags.is_empty() {
		return true;
	}
	tags.iter().any(|(key, value)| match POLYGON_FEATURES.get(key.as_str()) {
		Some(PolygonRule::All) => value != "no",
		Some(PolygonRule::Whitelist(values)) => values.contains(&value.as_str()),
		Some(PolygonRule::Blacklist(values)) => !values.contains(&value.as_str()),
		None => false,
	})
}
