// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory cache of resolved flag values.
//!
//! The cache is the single source of truth for "has this flag been resolved
//! yet". Entries are keyed by flag name and carry the value's type tag.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sysflags_core::FlagValue;

/// Thread-safe cache of effective flag values.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
	inner: Arc<RwLock<HashMap<String, FlagValue>>>,
}

impl ResolutionCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Gets the cached value of a flag.
	pub fn get(&self, name: &str) -> Option<FlagValue> {
		self.inner.read().get(name).cloned()
	}

	/// Stores the effective value of a flag, returning the previous one.
	pub fn insert(&self, name: &str, value: FlagValue) -> Option<FlagValue> {
		self.inner.write().insert(name.to_string(), value)
	}

	/// Removes a flag so that the next read re-resolves it.
	pub fn remove(&self, name: &str) -> Option<FlagValue> {
		self.inner.write().remove(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.inner.read().contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.inner.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.read().is_empty()
	}

	pub fn clear(&self) {
		self.inner.write().clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_and_get() {
		let cache = ResolutionCache::new();
		assert!(cache.get("3").is_none());

		assert_eq!(cache.insert("3", FlagValue::String("foo".to_string())), None);
		assert_eq!(cache.get("3"), Some(FlagValue::String("foo".to_string())));
		assert!(cache.contains("3"));
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn insert_returns_previous_value() {
		let cache = ResolutionCache::new();
		cache.insert("a", FlagValue::Boolean(false));
		assert_eq!(
			cache.insert("a", FlagValue::Boolean(true)),
			Some(FlagValue::Boolean(false))
		);
	}

	#[test]
	fn remove_invalidates() {
		let cache = ResolutionCache::new();
		cache.insert("a", FlagValue::Int(12));
		assert_eq!(cache.remove("a"), Some(FlagValue::Int(12)));
		assert!(!cache.contains("a"));
		assert_eq!(cache.remove("a"), None);
	}

	#[test]
	fn clear_empties_cache() {
		let cache = ResolutionCache::new();
		cache.insert("a", FlagValue::Int(1));
		cache.insert("b", FlagValue::Int(2));
		cache.clear();
		assert!(cache.is_empty());
	}

	#[test]
	fn clone_shares_state() {
		let cache = ResolutionCache::new();
		let clone = cache.clone();
		cache.insert("a", FlagValue::Boolean(true));
		assert_eq!(clone.get("a"), Some(FlagValue::Boolean(true)));
	}
}

#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn cache_keeps_last_write_per_key(
			writes in prop::collection::vec(("[a-e]", any::<i32>()), 1..50)
		) {
			let cache = ResolutionCache::new();
			let mut expected = HashMap::new();
			for (name, value) in &writes {
				cache.insert(name, FlagValue::Int(*value));
				expected.insert(name.clone(), *value);
			}

			prop_assert_eq!(cache.len(), expected.len());
			for (name, value) in expected {
				prop_assert_eq!(cache.get(&name), Some(FlagValue::Int(value)));
			}
		}
	}
}
