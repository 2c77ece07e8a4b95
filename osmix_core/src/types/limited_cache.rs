//! A size-bounded cache with approximate least-recently-used eviction.
//!
//! Every entry is weighed with [`CacheWeight`]; once the total weight exceeds the budget, the
//! older half of the entries (by last access) is dropped in one sweep.
//!
//! ```rust
//! use osmix_core::types::LimitedCache;
//!
//! let mut cache = LimitedCache::<u64, u64>::with_maximum_size(1_000_000);
//! cache.add(1, 42);
//! assert_eq!(cache.get(&1), Some(42));
//! ```

use crate::Blob;
use std::{collections::HashMap, fmt::Debug, hash::Hash, mem::size_of};

/// Approximate memory footprint of a cached value in bytes.
pub trait CacheWeight {
	fn weight(&self) -> usize;
}

impl CacheWeight for Blob {
	fn weight(&self) -> usize {
		size_of::<Blob>() + self.as_slice().len()
	}
}

macro_rules! fixed_weight {
	($($t:ty),*) => {
		$(impl CacheWeight for $t {
			fn weight(&self) -> usize {
				size_of::<$t>()
			}
		})*
	};
}
fixed_weight!(u8, u16, u32, u64, i32, i64, usize, bool);

impl CacheWeight for String {
	fn weight(&self) -> usize {
		size_of::<String>() + self.len()
	}
}

impl<T: CacheWeight> CacheWeight for Option<T> {
	fn weight(&self) -> usize {
		size_of::<Option<T>>() + self.as_ref().map_or(0, CacheWeight::weight)
	}
}

pub struct LimitedCache<K, V> {
	cache: HashMap<K, (V, u64)>,
	maximum_size: usize,
	size: usize,
	last_index: u64,
}

impl<K, V> LimitedCache<K, V>
where
	V: Clone + CacheWeight,
	K: Clone + Eq + Hash,
{
	/// Creates a cache that holds at most `maximum_size` bytes of values plus keys.
	#[must_use]
	pub fn with_maximum_size(maximum_size: usize) -> Self {
		Self {
			cache: HashMap::new(),
			maximum_size,
			size: 0,
			last_index: 0,
		}
	}

	/// Returns a clone of the cached value and marks it as recently used.
	pub fn get(&mut self, key: &K) -> Option<V> {
		let value = self.cache.get_mut(key)?;
		self.last_index += 1;
		value.1 = self.last_index;
		Some(value.0.clone())
	}

	/// Inserts `value` unless `key` is already cached, and returns the cached value.
	///
	/// A value heavier than the whole budget is returned without being stored.
	pub fn add(&mut self, key: K, value: V) -> V {
		if let Some(existing) = self.get(&key) {
			return existing;
		}
		let weight = Self::entry_weight(&value);
		if weight > self.maximum_size {
			return value;
		}
		while !self.cache.is_empty() && self.size + weight > self.maximum_size {
			self.cleanup();
		}

		self.last_index += 1;
		self.size += weight;
		self.cache.insert(key, (value.clone(), self.last_index));
		value
	}

	pub fn remove(&mut self, key: &K) -> Option<V> {
		let (value, _) = self.cache.remove(key)?;
		self.size -= Self::entry_weight(&value);
		Some(value)
	}

	pub fn clear(&mut self) {
		self.cache.clear();
		self.size = 0;
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.cache.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	/// Current total weight of keys and values.
	#[must_use]
	pub fn size(&self) -> usize {
		self.size
	}

	fn entry_weight(value: &V) -> usize {
		size_of::<K>() + value.weight()
	}

	/// Drops every entry accessed no later than the median access index.
	fn cleanup(&mut self) {
		let mut latest_access: Vec<u64> = self.cache.values().map(|e| e.1).collect();
		latest_access.sort_unstable();
		let median = latest_access[latest_access.len() / 2];
		let mut freed = 0;
		self.cache.retain(|_, e| {
			if e.1 <= median {
				freed += size_of::<K>() + e.0.weight();
				false
			} else {
				true
			}
		});
		self.size -= freed;
	}
}

impl<K, V> Debug for LimitedCache<K, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LimitedCache")
			.field("length", &self.cache.len())
			.field("size", &self.size)
			.field("maximum_size", &self.maximum_size)
			.finish()
	}
}
