// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag resolution.
//!
//! [`FeatureFlags`] owns the resolution cache, the server override records and
//! the listener list. A read resolves a flag's effective value once and then
//! serves it from the cache until a write invalidates it:
//!
//! 1. the base value (compiled default, resource lookup or system property)
//! 2. the local and server overrides, in the configured order
//! 3. the teamfood group flag, for eligible flags without an override

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use sysflags_core::{
	FlagDeclaration, FlagDefault, FlagKind, FlagRegistry, FlagValue, FlagsError, Result,
};
use tracing::{debug, trace, warn};

use crate::cache::ResolutionCache;
use crate::config::{FlagsConfig, OverridePrecedence};
use crate::listener::{FlagListener, ListenerId, ListenerRegistry};
use crate::restart::{LoggingRestarter, Restarter, SharedRestarter};
use crate::sources::{NoResources, ResourceSource, StaticSystemProperties, SystemProperties};
use crate::store::{InMemorySettingsStore, OverrideStore, SettingsStore};

/// Server override records keyed by `(namespace, name)`.
pub(crate) type ServerOverrides = HashMap<(String, String), FlagValue>;

/// Declarations of resolved flags keyed by `(namespace, name)`.
pub(crate) type ResolvedDeclarations = HashMap<(String, String), Arc<FlagDeclaration>>;

/// Builder for [`FeatureFlags`].
pub struct FeatureFlagsBuilder {
	registry: Arc<FlagRegistry>,
	settings: Option<Arc<dyn SettingsStore>>,
	resources: Option<Arc<dyn ResourceSource>>,
	properties: Option<Arc<dyn SystemProperties>>,
	restarter: Option<SharedRestarter>,
	config: FlagsConfig,
}

impl FeatureFlagsBuilder {
	pub fn new(registry: impl Into<Arc<FlagRegistry>>) -> Self {
		Self {
			registry: registry.into(),
			settings: None,
			resources: None,
			properties: None,
			restarter: None,
			config: FlagsConfig::default(),
		}
	}

	/// Sets the settings backend holding local overrides.
	///
	/// Defaults to an in-memory store.
	pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
		self.settings = Some(settings);
		self
	}

	/// Sets the resource source. Defaults to [`NoResources`].
	pub fn resources(mut self, resources: Arc<dyn ResourceSource>) -> Self {
		self.resources = Some(resources);
		self
	}

	/// Sets the system property source. Defaults to an empty property map.
	pub fn system_properties(mut self, properties: Arc<dyn SystemProperties>) -> Self {
		self.properties = Some(properties);
		self
	}

	/// Sets the restart capability. Defaults to [`LoggingRestarter`].
	pub fn restarter<R: Restarter + 'static>(mut self, restarter: R) -> Self {
		self.restarter = Some(Arc::new(restarter));
		self
	}

	pub fn shared_restarter(mut self, restarter: SharedRestarter) -> Self {
		self.restarter = Some(restarter);
		self
	}

	pub fn config(mut self, config: FlagsConfig) -> Self {
		self.config = config;
		self
	}

	pub fn build(self) -> FeatureFlags {
		let settings = self
			.settings
			.unwrap_or_else(|| Arc::new(InMemorySettingsStore::new()));
		let teamfood = self
			.registry
			.get(&self.config.teamfood_flag_name)
			.map(|decl| decl.as_ref().clone())
			.unwrap_or_else(|| FlagDeclaration {
				name: self.config.teamfood_flag_name.clone(),
				..FlagDeclaration::teamfood()
			});

		FeatureFlags {
			overrides: OverrideStore::new(settings, self.config.settings_key_prefix.clone()),
			resources: self.resources.unwrap_or_else(|| Arc::new(NoResources)),
			properties: self
				.properties
				.unwrap_or_else(|| Arc::new(StaticSystemProperties::new())),
			restarter: self.restarter.unwrap_or_else(|| Arc::new(LoggingRestarter)),
			registry: self.registry,
			cache: ResolutionCache::new(),
			server: RwLock::new(HashMap::new()),
			resolved: RwLock::new(HashMap::new()),
			listeners: ListenerRegistry::default(),
			teamfood,
			config: self.config,
			lock: ReentrantMutex::new(()),
		}
	}
}

/// The feature flag resolver.
///
/// Cache hits take only the cache read lock. Every path that computes or
/// mutates state runs under one re-entrant lock, so listeners and restarters
/// called from inside a mutation may read flags again on the same thread.
pub struct FeatureFlags {
	pub(crate) registry: Arc<FlagRegistry>,
	pub(crate) cache: ResolutionCache,
	pub(crate) overrides: OverrideStore,
	pub(crate) resources: Arc<dyn ResourceSource>,
	pub(crate) properties: Arc<dyn SystemProperties>,
	pub(crate) server: RwLock<ServerOverrides>,
	/// Every declaration that has been read, registered or not.
	pub(crate) resolved: RwLock<ResolvedDeclarations>,
	pub(crate) listeners: ListenerRegistry,
	pub(crate) restarter: SharedRestarter,
	pub(crate) teamfood: FlagDeclaration,
	pub(crate) config: FlagsConfig,
	pub(crate) lock: ReentrantMutex<()>,
}

impl FeatureFlags {
	pub fn builder(registry: impl Into<Arc<FlagRegistry>>) -> FeatureFlagsBuilder {
		FeatureFlagsBuilder::new(registry)
	}

	pub fn registry(&self) -> &FlagRegistry {
		&self.registry
	}

	pub fn config(&self) -> &FlagsConfig {
		&self.config
	}

	pub fn cache(&self) -> &ResolutionCache {
		&self.cache
	}

	/// Returns the effective value of a boolean flag.
	pub fn is_enabled(&self, decl: &FlagDeclaration) -> Result<bool> {
		expect_kind(decl, FlagKind::Boolean)?;
		match self.get_value(decl)? {
			FlagValue::Boolean(b) => Ok(b),
			other => Err(mismatch(decl, FlagKind::Boolean, other.kind())),
		}
	}

	/// Returns the effective value of a string flag.
	pub fn get_string(&self, decl: &FlagDeclaration) -> Result<String> {
		expect_kind(decl, FlagKind::String)?;
		match self.get_value(decl)? {
			FlagValue::String(s) => Ok(s),
			other => Err(mismatch(decl, FlagKind::String, other.kind())),
		}
	}

	/// Returns the effective value of an int flag.
	pub fn get_int(&self, decl: &FlagDeclaration) -> Result<i32> {
		expect_kind(decl, FlagKind::Int)?;
		match self.get_value(decl)? {
			FlagValue::Int(i) => Ok(i),
			other => Err(mismatch(decl, FlagKind::Int, other.kind())),
		}
	}

	/// Returns the effective value of a flag, resolving it on a cache miss.
	///
	/// Failures are neither cached nor retried.
	pub fn get_value(&self, decl: &FlagDeclaration) -> Result<FlagValue> {
		if let Some(value) = self.cached(decl) {
			trace!(flag = %decl.name, "cache hit");
			return Ok(value);
		}

		let _guard = self.lock.lock();
		// A writer may have resolved it while we waited.
		if let Some(value) = self.cached(decl) {
			return Ok(value);
		}

		debug!(flag = %decl.name, "cache miss, resolving");
		let value = self.compute(decl)?;
		self.cache.insert(&decl.name, value.clone());
		self
			.resolved
			.write()
			.entry((decl.namespace.clone(), decl.name.clone()))
			.or_insert_with(|| Arc::new(decl.clone()));
		Ok(value)
	}

	/// Returns the effective value of the declared flag `name`.
	pub fn value_of(&self, name: &str) -> Result<FlagValue> {
		let decl = self
			.registry
			.get(name)
			.cloned()
			.ok_or_else(|| FlagsError::UnknownFlag(name.to_string()))?;
		self.get_value(&decl)
	}

	/// Registers a listener for changes to the local override of `flag_name`.
	pub fn add_listener<L: FlagListener + 'static>(&self, flag_name: &str, listener: L) -> ListenerId {
		self.listeners.add(flag_name, Arc::new(listener))
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		self.listeners.remove(id)
	}

	fn cached(&self, decl: &FlagDeclaration) -> Option<FlagValue> {
		self
			.cache
			.get(&decl.name)
			.filter(|value| value.kind() == decl.kind())
	}

	/// Resolves a flag without consulting or updating its cache entry.
	pub(crate) fn compute(&self, decl: &FlagDeclaration) -> Result<FlagValue> {
		// Broken resources must surface even when an override exists.
		let base = self.base_value(decl)?;
		let local = self.local_override(decl)?;
		let server = self.server_value(decl);

		let chosen = match self.config.precedence {
			OverridePrecedence::LocalFirst => local.or(server),
			OverridePrecedence::ServerFirst => server.or(local),
		};
		if let Some(value) = chosen {
			return Ok(value);
		}

		if base == FlagValue::Boolean(false)
			&& decl.is_teamfood_eligible()
			&& decl.name != self.teamfood.name
		{
			let teamfood = self.teamfood.clone();
			trace!(flag = %decl.name, "following teamfood flag");
			return self.get_value(&teamfood);
		}

		Ok(base)
	}

	fn base_value(&self, decl: &FlagDeclaration) -> Result<FlagValue> {
		match &decl.default {
			FlagDefault::Value { value } => Ok(value.clone()),
			FlagDefault::Resource { kind, resource_id } => {
				let id = *resource_id;
				match kind {
					FlagKind::Boolean => self.resources.get_bool(id).map(FlagValue::Boolean),
					FlagKind::Int => self.resources.get_int(id).map(FlagValue::Int),
					FlagKind::String => match self.resources.get_string(id)? {
						Some(s) => Ok(FlagValue::String(s)),
						None => Err(FlagsError::NullResource { resource_id: id }),
					},
				}
			}
			FlagDefault::SystemProperty { property, default } => Ok(FlagValue::Boolean(
				self.properties.get_bool(property, *default),
			)),
		}
	}

	/// Reads the persisted local override.
	///
	/// Data that does not decode as the declared kind fails with
	/// [`FlagsError::Serialization`].
	pub(crate) fn local_override(&self, decl: &FlagDeclaration) -> Result<Option<FlagValue>> {
		self.overrides.read_flag_value(&decl.name, decl.kind())
	}

	/// Declaration of `(namespace, name)`, from the registry or from an
	/// earlier read.
	pub(crate) fn declaration(&self, namespace: &str, name: &str) -> Option<Arc<FlagDeclaration>> {
		if let Some(decl) = self.registry.find(namespace, name) {
			return Some(Arc::clone(decl));
		}
		self
			.resolved
			.read()
			.get(&(namespace.to_string(), name.to_string()))
			.cloned()
	}

	/// Server record for a flag, if one of the declared kind exists.
	pub(crate) fn server_value(&self, decl: &FlagDeclaration) -> Option<FlagValue> {
		let key = (decl.namespace.clone(), decl.name.clone());
		let value = self.server.read().get(&key).cloned()?;
		if value.kind() != decl.kind() {
			warn!(
				flag = %decl.name,
				namespace = %decl.namespace,
				expected = %decl.kind(),
				actual = %value.kind(),
				"ignoring server override of the wrong kind"
			);
			return None;
		}
		Some(value)
	}

	/// Drops cached values of flags that follow the teamfood flag.
	pub(crate) fn invalidate_teamfood_followers(&self, name: &str) {
		if name != self.teamfood.name {
			return;
		}
		for decl in self.resolved.read().values() {
			if decl.is_teamfood_eligible() && decl.name != self.teamfood.name {
				self.cache.remove(&decl.name);
			}
		}
	}
}

impl std::fmt::Debug for FeatureFlags {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FeatureFlags")
			.field("flags", &self.registry.len())
			.field("cached", &self.cache.len())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

fn expect_kind(decl: &FlagDeclaration, expected: FlagKind) -> Result<()> {
	if decl.kind() == expected {
		Ok(())
	} else {
		Err(mismatch(decl, expected, decl.kind()))
	}
}

fn mismatch(decl: &FlagDeclaration, expected: FlagKind, actual: FlagKind) -> FlagsError {
	FlagsError::TypeMismatch {
		name: decl.name.clone(),
		expected,
		actual,
	}
}
