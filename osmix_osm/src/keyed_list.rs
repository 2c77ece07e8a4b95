use std::{collections::HashMap, hash::Hash};

/// A mapping from keys to ordered lists of values.
///
/// ```rust
/// use osmix_osm::KeyedList;
///
/// let mut list = KeyedList::new();
/// list.add("highway", 1);
/// list.add("highway", 4);
/// list.add("building", 2);
/// assert_eq!(list.get(&"highway"), &[1, 4]);
/// assert!(list.get(&"amenity").is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct KeyedList<K, V> {
	map: HashMap<K, Vec<V>>,
}

impl<K: Eq + Hash, V> KeyedList<K, V> {
	#[must_use]
	pub fn new() -> Self {
		KeyedList { map: HashMap::new() }
	}

	/// Appends `value` to the list of `key`, creating the list on first use.
	pub fn add(&mut self, key: K, value: V) {
		self.map.entry(key).or_default().push(value);
	}

	/// The values of `key` in insertion order; empty if the key was never added.
	pub fn get<Q>(&self, key: &Q) -> &[V]
	where
		K: std::borrow::Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.map.get(key).map_or(&[], Vec::as_slice)
	}

	pub fn remove<Q>(&mut self, key: &Q) -> Option<Vec<V>>
	where
		K: std::borrow::Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.map.remove(key)
	}

	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: std::borrow::Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.map.contains_key(key)
	}

	/// Number of keys.
	#[must_use]
	pub fn len(&self) -> usize {
		self.map.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &K> {
		self.map.keys()
	}

	pub fn clear(&mut self) {
		self.map.clear();
	}
}

impl<K: Eq + Hash, V> Default for KeyedList<K, V> {
	fn default() -> Self {
		Self::new()
	}
}
