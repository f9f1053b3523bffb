// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Base-value sources for resource-backed and system-property-backed flags.

use std::collections::HashMap;

use sysflags_core::{FlagValue, FlagsError, ResourceId, Result};

/// Lookup of resource values by id.
///
/// Every method fails with [`FlagsError::ResourceNotFound`] when the id does
/// not name a resource of the requested type.
pub trait ResourceSource: Send + Sync {
	fn get_bool(&self, id: ResourceId) -> Result<bool>;

	/// `Ok(None)` means the resource exists but has no content.
	fn get_string(&self, id: ResourceId) -> Result<Option<String>>;

	fn get_int(&self, id: ResourceId) -> Result<i32>;
}

/// Read access to system properties.
pub trait SystemProperties: Send + Sync {
	/// Returns the boolean property `name`, or `default` when unset or unparseable.
	fn get_bool(&self, name: &str, default: bool) -> bool;
}

/// A resource source with no resources; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceSource for NoResources {
	fn get_bool(&self, id: ResourceId) -> Result<bool> {
		Err(FlagsError::ResourceNotFound { resource_id: id })
	}

	fn get_string(&self, id: ResourceId) -> Result<Option<String>> {
		Err(FlagsError::ResourceNotFound { resource_id: id })
	}

	fn get_int(&self, id: ResourceId) -> Result<i32> {
		Err(FlagsError::ResourceNotFound { resource_id: id })
	}
}

/// Resources held in a map. A `None` entry is a resource without content.
#[derive(Debug, Clone, Default)]
pub struct StaticResources {
	values: HashMap<ResourceId, Option<FlagValue>>,
}

impl StaticResources {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, id: u32, value: FlagValue) -> Self {
		self.insert(ResourceId(id), Some(value));
		self
	}

	pub fn with_null(mut self, id: u32) -> Self {
		self.insert(ResourceId(id), None);
		self
	}

	pub fn insert(&mut self, id: ResourceId, value: Option<FlagValue>) {
		self.values.insert(id, value);
	}

	fn lookup(&self, id: ResourceId) -> Result<&Option<FlagValue>> {
		self
			.values
			.get(&id)
			.ok_or(FlagsError::ResourceNotFound { resource_id: id })
	}
}

impl ResourceSource for StaticResources {
	fn get_bool(&self, id: ResourceId) -> Result<bool> {
		match self.lookup(id)? {
			Some(FlagValue::Boolean(b)) => Ok(*b),
			_ => Err(FlagsError::ResourceNotFound { resource_id: id }),
		}
	}

	fn get_string(&self, id: ResourceId) -> Result<Option<String>> {
		match self.lookup(id)? {
			Some(FlagValue::String(s)) => Ok(Some(s.clone())),
			None => Ok(None),
			_ => Err(FlagsError::ResourceNotFound { resource_id: id }),
		}
	}

	fn get_int(&self, id: ResourceId) -> Result<i32> {
		match self.lookup(id)? {
			Some(FlagValue::Int(i)) => Ok(*i),
			_ => Err(FlagsError::ResourceNotFound { resource_id: id }),
		}
	}
}

/// System properties held in a map.
#[derive(Debug, Clone, Default)]
pub struct StaticSystemProperties {
	values: HashMap<String, bool>,
}

impl StaticSystemProperties {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
		self.values.insert(name.into(), value);
		self
	}
}

impl SystemProperties for StaticSystemProperties {
	fn get_bool(&self, name: &str, default: bool) -> bool {
		self.values.get(name).copied().unwrap_or(default)
	}
}

/// System properties read from `SYSFLAGS_PROP_<NAME>` environment variables.
///
/// The property name is upper-cased and every character outside `[A-Z0-9]`
/// becomes `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSystemProperties;

impl EnvSystemProperties {
	pub fn variable_name(property: &str) -> String {
		let suffix: String = property
			.chars()
			.map(|c| {
				if c.is_ascii_alphanumeric() {
					c.to_ascii_uppercase()
				} else {
					'_'
				}
			})
			.collect();
		format!("SYSFLAGS_PROP_{suffix}")
	}
}

impl SystemProperties for EnvSystemProperties {
	fn get_bool(&self, name: &str, default: bool) -> bool {
		match std::env::var(Self::variable_name(name)) {
			Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
			Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") => false,
			_ => default,
		}
	}
}
