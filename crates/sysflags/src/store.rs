// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted local overrides.
//!
//! The resolver never talks to a settings backend directly. It goes through
//! [`OverrideStore`], which derives the settings key for a flag and encodes
//! values with the serializer registry before handing raw strings to a
//! [`SettingsStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sysflags_core::{serializer, FlagKind, FlagSerializer, FlagValue, FlagsError, Result};
use tracing::{debug, trace};

/// Which user a settings write belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserScope {
	#[default]
	Current,
	System,
}

/// Raw key-value settings backend.
pub trait SettingsStore: Send + Sync {
	/// Returns the raw string stored under `key`, if any.
	fn get_string(&self, key: &str) -> Result<Option<String>>;

	/// Stores `value` under `key`.
	fn put_string(&self, key: &str, value: &str, scope: UserScope) -> Result<()>;
}

/// Settings store held in memory, for tests and embedders without persistence.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
	values: Mutex<BTreeMap<String, String>>,
}

impl InMemorySettingsStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy of every stored entry.
	pub fn entries(&self) -> BTreeMap<String, String> {
		self.values.lock().clone()
	}
}

impl SettingsStore for InMemorySettingsStore {
	fn get_string(&self, key: &str) -> Result<Option<String>> {
		Ok(self.values.lock().get(key).cloned())
	}

	fn put_string(&self, key: &str, value: &str, scope: UserScope) -> Result<()> {
		trace!(key, ?scope, "storing setting");
		self.values.lock().insert(key.to_string(), value.to_string());
		Ok(())
	}
}

/// Settings store persisted as a single JSON object on disk.
///
/// A missing file reads as an empty store. Every write rewrites the file
/// through a temporary sibling and a rename.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
	path: PathBuf,
	lock: Mutex<()>,
}

impl JsonFileSettingsStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load(&self) -> Result<BTreeMap<String, String>> {
		if !self.path.exists() {
			return Ok(BTreeMap::new());
		}
		let content = std::fs::read_to_string(&self.path)
			.map_err(|e| FlagsError::Store(format!("failed to read {}: {e}", self.path.display())))?;
		if content.trim().is_empty() {
			return Ok(BTreeMap::new());
		}
		serde_json::from_str(&content)
			.map_err(|e| FlagsError::Store(format!("failed to parse {}: {e}", self.path.display())))
	}

	fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent).map_err(|e| {
					FlagsError::Store(format!("failed to create {}: {e}", parent.display()))
				})?;
			}
		}
		let content = serde_json::to_string_pretty(values)?;
		let tmp = self.path.with_extension("json.tmp");
		std::fs::write(&tmp, content)
			.map_err(|e| FlagsError::Store(format!("failed to write {}: {e}", tmp.display())))?;
		std::fs::rename(&tmp, &self.path)
			.map_err(|e| FlagsError::Store(format!("failed to replace {}: {e}", self.path.display())))
	}
}

impl SettingsStore for JsonFileSettingsStore {
	fn get_string(&self, key: &str) -> Result<Option<String>> {
		let _guard = self.lock.lock();
		Ok(self.load()?.get(key).cloned())
	}

	fn put_string(&self, key: &str, value: &str, scope: UserScope) -> Result<()> {
		let _guard = self.lock.lock();
		let mut values = self.load()?;
		values.insert(key.to_string(), value.to_string());
		self.save(&values)?;
		debug!(path = %self.path.display(), key, ?scope, "settings file updated");
		Ok(())
	}
}

/// Typed view over a [`SettingsStore`] holding local flag overrides.
#[derive(Clone)]
pub struct OverrideStore {
	settings: Arc<dyn SettingsStore>,
	key_prefix: String,
}

impl OverrideStore {
	pub fn new(settings: Arc<dyn SettingsStore>, key_prefix: impl Into<String>) -> Self {
		Self {
			settings,
			key_prefix: key_prefix.into(),
		}
	}

	/// Settings key under which the override for `name` is stored.
	pub fn settings_key(&self, name: &str) -> String {
		format!("{}{}", self.key_prefix, name)
	}

	/// Reads the local override of a flag. Absent and cleared overrides are `None`.
	pub fn read_flag_value(&self, name: &str, kind: FlagKind) -> Result<Option<FlagValue>> {
		let key = self.settings_key(name);
		match self.settings.get_string(&key)? {
			Some(data) => FlagSerializer::for_kind(kind).from_settings_data(&data),
			None => Ok(None),
		}
	}

	/// Persists a local override.
	pub fn write_flag_value(&self, name: &str, value: &FlagValue) -> Result<()> {
		let data = serializer::encode(value)?;
		self
			.settings
			.put_string(&self.settings_key(name), &data, UserScope::Current)
	}

	/// Erases a local override by storing the empty string.
	pub fn erase_flag_value(&self, name: &str) -> Result<()> {
		self
			.settings
			.put_string(&self.settings_key(name), "", UserScope::Current)
	}
}

impl std::fmt::Debug for OverrideStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OverrideStore")
			.field("key_prefix", &self.key_prefix)
			.finish_non_exhaustive()
	}
}
