use crate::Element;
use std::collections::HashMap;

/// Dense storage of one entity kind with an id index.
///
/// Removal leaves a tombstone so the index of every other entity stays valid.
#[derive(Clone, Debug)]
pub struct Table<T> {
	slots: Vec<Option<T>>,
	ids: HashMap<i64, usize>,
}

impl<T: Element> Table<T> {
	pub fn new() -> Self {
		Table {
			slots: Vec::new(),
			ids: HashMap::new(),
		}
	}

	/// Appends `entity`; returns `None` if the id is taken.
	pub fn insert(&mut self, entity: T) -> Option<usize> {
		let id = entity.id();
		if self.ids.contains_key(&id) {
			return None;
		}
		let index = self.slots.len();
		self.slots.push(Some(entity));
		self.ids.insert(id, index);
		Some(index)
	}

	/// Replaces the entity with the same id and returns the previous one with its index.
	pub fn replace(&mut self, entity: T) -> Option<(usize, T)> {
		let index = *self.ids.get(&entity.id())?;
		let previous = self.slots[index].replace(entity)?;
		Some((index, previous))
	}

	pub fn remove(&mut self, id: i64) -> Option<(usize, T)> {
		let index = self.ids.remove(&id)?;
		let previous = self.slots[index].take()?;
		Some((index, previous))
	}

	pub fn get(&self, id: i64) -> Option<&T> {
		self.at(*self.ids.get(&id)?)
	}

	pub fn index_of(&self, id: i64) -> Option<usize> {
		self.ids.get(&id).copied()
	}

	pub fn contains(&self, id: i64) -> bool {
		self.ids.contains_key(&id)
	}

	pub fn at(&self, index: usize) -> Option<&T> {
		self.slots.get(index)?.as_ref()
	}

	/// Live entities with their index, in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
		self.slots.iter().enumerate().filter_map(|(i, slot)| Some((i, slot.as_ref()?)))
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn reserve(&mut self, additional: usize) {
		self.slots.reserve(additional);
		self.ids.reserve(additional);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::OsmNode;

	#[test]
	fn tombstones_keep_indexes() {
		let mut table = Table::new();
		assert_eq!(table.insert(OsmNode::new(10, 0.0, 0.0)), Some(0));
		assert_eq!(table.insert(OsmNode::new(20, 1.0, 1.0)), Some(1));
		assert_eq!(table.insert(OsmNode::new(10, 2.0, 2.0)), None);

		assert_eq!(table.remove(10).map(|(i, n)| (i, n.id)), Some((0, 10)));
		assert_eq!(table.index_of(20), Some(1));
		assert_eq!(table.len(), 1);
		assert!(table.get(10).is_none());

		assert_eq!(table.insert(OsmNode::new(10, 3.0, 3.0)), Some(2));
		let ids: Vec<(usize, i64)> = table.iter().map(|(i, n)| (i, n.id)).collect();
		assert_eq!(ids, vec![(1, 20), (2, 10)]);
	}

	#[test]
	fn replace_in_place() {
		let mut table = Table::new();
		table.insert(OsmNode::new(1, 0.0, 0.0));
		let (index, previous) = table.replace(OsmNode::new(1, 5.0, 5.0)).unwrap();
		assert_eq!((index, previous.lon), (0, 0));
		assert_eq!(table.get(1).unwrap().lon(), 5.0);
		assert!(table.replace(OsmNode::new(2, 0.0, 0.0)).is_none());
	}
}
