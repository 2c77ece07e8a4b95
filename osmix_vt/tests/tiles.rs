use anyhow::Result;
use osmix_core::TileCoord;
use osmix_geometry::vector_tile::VectorTile;
use osmix_osm::{EntityStore, IndexOptions, OsmNode, OsmWay, SpatialIndex, Tags};
use osmix_vt::{DEFAULT_TILE_CACHE_SIZE, TileConfig, TileProfile, TileSource, strategy_for};
use rstest::rstest;

/// A closed park ring with a fountain in the middle, near Nice.
fn park() -> Result<EntityStore> {
	let mut store = EntityStore::default();
	let corners = [[7.26, 43.69], [7.27, 43.69], [7.27, 43.70], [7.26, 43.70]];
	for (i, [lon, lat]) in corners.into_iter().enumerate() {
		store.create(OsmNode::new(i as i64 + 1, lon, lat))?;
	}
	store.create(OsmWay::new(10, vec![1, 2, 3, 4, 1]).with_tags(Tags::from(vec![("leisure", "park")])))?;
	store.create(OsmNode::new(5, 7.265, 43.695).with_tags(Tags::from(vec![("amenity", "fountain")])))?;
	Ok(store)
}

#[rstest]
#[case(TileProfile::Default, &["nodes", "ways"])]
#[case(TileProfile::Shortbread, &["land", "pois"])]
fn tiles_from_a_decoded_pbf(#[case] profile: TileProfile, #[case] layers: &[&str]) -> Result<()> {
	let original = park()?;
	let decoded = EntityStore::from_pbf(&original.to_pbf()?)?;
	let coord = TileCoord::from_geo(7.265, 43.695, 13)?;
	let config = TileConfig::default().with_profile(profile);

	let mut tiles = Vec::new();
	for store in [&original, &decoded] {
		let index = SpatialIndex::build(store, IndexOptions::default());
		let mut strategy = strategy_for(&config, DEFAULT_TILE_CACHE_SIZE);
		tiles.push(strategy.get_tile(&TileSource::new(store, &index), &coord)?);
	}
	assert_eq!(tiles[0], tiles[1]);

	let tile = VectorTile::from_blob(&tiles[0])?;
	let names: Vec<&str> = tile.layers.iter().map(|layer| layer.name.as_str()).collect();
	assert_eq!(names, layers);
	Ok(())
}

#[test]
fn every_zoom_level_of_the_world() -> Result<()> {
	let store = park()?;
	let index = SpatialIndex::build(&store, IndexOptions::default());
	let mut strategy = strategy_for(&TileConfig::default(), DEFAULT_TILE_CACHE_SIZE);
	for z in 0..=16 {
		let coord = TileCoord::from_geo(7.265, 43.695, z)?;
		let blob = strategy.get_tile(&TileSource::new(&store, &index), &coord)?;
		let tile = VectorTile::from_blob(&blob)?;
		assert!(tile.find_layer("nodes").is_some(), "fountain missing at zoom {z}");
	}
	Ok(())
}
