use crate::geo::{GeoProperties, GeoValue};
use anyhow::{Context, Result, anyhow, ensure};
use std::{collections::HashMap, fmt::Debug, hash::Hash};

/// An indexed table: entries keep their insertion position, duplicates map to the first index.
#[derive(Clone, PartialEq)]
pub struct VTLPMap<T>
where
	T: Clone + Eq + Hash,
{
	list: Vec<T>,
	map: HashMap<T, u32>,
}

impl<T> VTLPMap<T>
where
	T: Clone + Debug + Eq + Hash,
{
	#[must_use]
	pub fn new(list: Vec<T>) -> VTLPMap<T> {
		let map = list.iter().enumerate().map(|(i, e)| (e.clone(), i as u32)).collect();
		VTLPMap { list, map }
	}

	pub fn add(&mut self, entry: T) -> u32 {
		if let Some(index) = self.map.get(&entry) {
			return *index;
		}
		let index = self.list.len() as u32;
		self.map.insert(entry.clone(), index);
		self.list.push(entry);
		index
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		self.list.iter()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.list.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	pub fn get(&self, id: u32) -> Result<&T> {
		self
			.list
			.get(id as usize)
			.ok_or_else(|| anyhow!("id '{id:?}' not found"))
	}
}

impl<T: Clone + Debug + Eq + Hash> Default for VTLPMap<T> {
	fn default() -> VTLPMap<T> {
		VTLPMap::new(vec![])
	}
}

impl<T> Debug for VTLPMap<T>
where
	T: Clone + Debug + Eq + Hash,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(&self.list).finish()
	}
}

/// The key and value tables of one layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyManager {
	pub key: VTLPMap<String>,
	pub val: VTLPMap<GeoValue>,
}

impl PropertyManager {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_key(&mut self, key: String) -> u32 {
		self.key.add(key)
	}

	pub fn add_val(&mut self, value: GeoValue) -> u32 {
		self.val.add(value)
	}

	/// Builds tables ordered by descending frequency, so common keys and values get small indices.
	pub fn from_iter<'a, I>(geo_property_iter: I) -> Self
	where
		I: IntoIterator<Item = &'a GeoProperties>,
	{
		let mut key_map: HashMap<String, u32> = HashMap::new();
		let mut val_map: HashMap<GeoValue, u32> = HashMap::new();

		for properties in geo_property_iter {
			for (k, v) in properties.iter() {
				*key_map.entry(k.clone()).or_insert(0) += 1;
				*val_map.entry(v.clone()).or_insert(0) += 1;
			}
		}

		fn make_lookup<T>(map: HashMap<T, u32>) -> VTLPMap<T>
		where
			T: Clone + Debug + Eq + Hash + Ord,
		{
			let mut vec: Vec<(T, u32)> = map.into_iter().collect();
			vec.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
			VTLPMap::new(vec.into_iter().map(|(v, _)| v).collect())
		}

		Self {
			key: make_lookup(key_map),
			val: make_lookup(val_map),
		}
	}

	pub fn encode_tag_ids(&mut self, properties: GeoProperties) -> Vec<u32> {
		let mut tag_ids: Vec<u32> = Vec::with_capacity(properties.len() * 2);
		for (key, val) in properties {
			tag_ids.push(self.key.add(key));
			tag_ids.push(self.val.add(val));
		}
		tag_ids
	}

	pub fn decode_tag_ids(&self, tag_ids: &[u32]) -> Result<GeoProperties> {
		ensure!(tag_ids.len().is_multiple_of(2), "Tag IDs must be even");
		let mut properties = GeoProperties::new();

		for pair in tag_ids.chunks_exact(2) {
			properties.insert(
				self.key.get(pair[0]).context("Failed to get property key")?.to_owned(),
				self.val.get(pair[1]).context("Failed to get property value")?.clone(),
			);
		}
		Ok(properties)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vtlp_map_deduplicates() -> Result<()> {
		let mut map = VTLPMap::<String>::default();
		assert_eq!(map.add("a".into()), 0);
		assert_eq!(map.add("b".into()), 1);
		assert_eq!(map.add("a".into()), 0);
		assert_eq!(map.len(), 2);
		assert_eq!(map.get(1)?, "b");
		assert!(map.get(2).is_err());
		Ok(())
	}

	#[test]
	fn frequency_order() {
		let p1 = GeoProperties::from(vec![("name", "x"), ("kind", "road")]);
		let p2 = GeoProperties::from(vec![("kind", "road")]);
		let manager = PropertyManager::from_iter([&p1, &p2]);
		assert_eq!(manager.key.iter().collect::<Vec<_>>(), vec!["kind", "name"]);
		assert_eq!(
			manager.val.iter().collect::<Vec<_>>(),
			vec![&GeoValue::from("road"), &GeoValue::from("x")]
		);
	}

	#[test]
	fn encode_decode_tags() -> Result<()> {
		let mut manager = PropertyManager::new();
		let properties = GeoProperties::from(vec![("a", "1"), ("b", "1")]);
		let ids = manager.encode_tag_ids(properties.clone());
		assert_eq!(ids, vec![0, 0, 1, 0]);
		assert_eq!(manager.decode_tag_ids(&ids)?, properties);
		assert!(manager.decode_tag_ids(&[0]).is_err());
		assert!(manager.decode_tag_ids(&[0, 5]).is_err());
		Ok(())
	}
}
