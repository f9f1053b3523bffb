// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag declarations file.
//!
//! ```toml
//! [[flags]]
//! id = 3
//! name = "clock_style"
//! namespace = "systemui"
//! category = "string"
//! default = "digital"
//!
//! [[flags]]
//! id = 5
//! name = "max_tiles"
//! namespace = "systemui"
//! category = "resource_int"
//! resource_id = 1005
//!
//! [[resources]]
//! id = 1005
//! value = 12
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sysflags::StaticResources;
use sysflags_core::{
	FlagDeclaration, FlagDefault, FlagKind, FlagRegistry, FlagValue, ResourceId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Category {
	Released,
	Unreleased,
	Boolean,
	String,
	Int,
	ResourceBoolean,
	ResourceString,
	ResourceInt,
	Sysprop,
}

#[derive(Debug, Deserialize)]
struct FlagEntry {
	id: u32,
	name: String,
	namespace: String,
	category: Category,
	default: Option<toml::Value>,
	resource_id: Option<u32>,
	property: Option<String>,
	#[serde(default)]
	teamfood: bool,
}

#[derive(Debug, Deserialize)]
struct ResourceEntry {
	id: u32,
	/// A missing value declares a resource without content.
	value: Option<toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct DeclarationsFile {
	#[serde(default)]
	flags: Vec<FlagEntry>,
	#[serde(default)]
	resources: Vec<ResourceEntry>,
}

/// Parsed declarations: the flag registry and the resources backing it.
#[derive(Debug)]
pub struct Declarations {
	pub registry: FlagRegistry,
	pub resources: StaticResources,
}

impl Declarations {
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read declarations {}", path.display()))?;
		Self::parse(&content).with_context(|| format!("invalid declarations {}", path.display()))
	}

	pub fn parse(content: &str) -> Result<Self> {
		let file: DeclarationsFile = toml::from_str(content)?;

		let declarations = file
			.flags
			.into_iter()
			.map(FlagEntry::into_declaration)
			.collect::<Result<Vec<_>>>()?;
		let registry = FlagRegistry::new(declarations)?;

		let mut resources = StaticResources::new();
		for entry in file.resources {
			let value = entry.value.map(|v| resource_value(entry.id, v)).transpose()?;
			resources.insert(ResourceId(entry.id), value);
		}

		Ok(Self {
			registry,
			resources,
		})
	}
}

impl FlagEntry {
	fn into_declaration(self) -> Result<FlagDeclaration> {
		let decl = match self.category {
			Category::Released => FlagDeclaration::released(self.id, &self.name, &self.namespace),
			Category::Unreleased => FlagDeclaration::unreleased(self.id, &self.name, &self.namespace),
			Category::Boolean => {
				let value = self.default_bool()?.unwrap_or(false);
				FlagDeclaration::new(
					self.id,
					&self.name,
					&self.namespace,
					FlagDefault::Value {
						value: FlagValue::Boolean(value),
					},
				)
			}
			Category::String => {
				let value = match &self.default {
					Some(toml::Value::String(s)) => s.clone(),
					None => String::new(),
					Some(other) => bail!("flag {}: default {other} is not a string", self.name),
				};
				FlagDeclaration::string(self.id, &self.name, &self.namespace, value)
			}
			Category::Int => {
				let value = match &self.default {
					Some(toml::Value::Integer(i)) => i32::try_from(*i)
						.with_context(|| format!("flag {}: default {i} out of range", self.name))?,
					None => 0,
					Some(other) => bail!("flag {}: default {other} is not an int", self.name),
				};
				FlagDeclaration::int(self.id, &self.name, &self.namespace, value)
			}
			Category::ResourceBoolean => self.resource(FlagKind::Boolean)?,
			Category::ResourceString => self.resource(FlagKind::String)?,
			Category::ResourceInt => self.resource(FlagKind::Int)?,
			Category::Sysprop => {
				let default = self.default_bool()?.unwrap_or(false);
				let property = self.property.clone().unwrap_or_else(|| self.name.clone());
				FlagDeclaration {
					default: FlagDefault::SystemProperty { property, default },
					..FlagDeclaration::sysprop(self.id, &self.name, &self.namespace, default)
				}
			}
		};
		Ok(if self.teamfood { decl.with_teamfood() } else { decl })
	}

	fn default_bool(&self) -> Result<Option<bool>> {
		match &self.default {
			Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
			None => Ok(None),
			Some(other) => bail!("flag {}: default {other} is not a boolean", self.name),
		}
	}

	fn resource(&self, kind: FlagKind) -> Result<FlagDeclaration> {
		let Some(resource_id) = self.resource_id else {
			bail!("flag {}: resource_id is required", self.name);
		};
		Ok(FlagDeclaration::resource(
			self.id,
			&self.name,
			&self.namespace,
			kind,
			resource_id,
		))
	}
}

fn resource_value(id: u32, value: toml::Value) -> Result<FlagValue> {
	match value {
		toml::Value::Boolean(b) => Ok(FlagValue::Boolean(b)),
		toml::Value::String(s) => Ok(FlagValue::String(s)),
		toml::Value::Integer(i) => i32::try_from(i)
			.map(FlagValue::Int)
			.with_context(|| format!("resource {id}: value {i} out of range")),
		other => bail!("resource {id}: unsupported value {other}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sysflags::ResourceSource;

	const SAMPLE: &str = r#"
[[flags]]
id = 1
name = "teamfood"
namespace = "systemui"
category = "unreleased"

[[flags]]
id = 3
name = "clock_style"
namespace = "systemui"
category = "string"
default = "digital"

[[flags]]
id = 4
name = "quick_tiles"
namespace = "systemui"
category = "unreleased"
teamfood = true

[[flags]]
id = 5
name = "max_tiles"
namespace = "systemui"
category = "resource_int"
resource_id = 1005

[[flags]]
id = 6
name = "debug_overlay"
namespace = "systemui"
category = "sysprop"
property = "persist.debug.overlay"

[[resources]]
id = 1005
value = 12

[[resources]]
id = 1006
"#;

	#[test]
	fn parses_every_category_used() {
		let decls = Declarations::parse(SAMPLE).unwrap();
		let registry = &decls.registry;
		assert_eq!(registry.len(), 5);

		assert_eq!(registry.get("clock_style").unwrap().kind(), FlagKind::String);
		assert!(registry.get("quick_tiles").unwrap().is_teamfood_eligible());
		assert_eq!(
			registry.get("max_tiles").unwrap().default,
			FlagDefault::Resource {
				kind: FlagKind::Int,
				resource_id: ResourceId(1005)
			}
		);
		assert_eq!(
			registry.get("debug_overlay").unwrap().default,
			FlagDefault::SystemProperty {
				property: "persist.debug.overlay".to_string(),
				default: false
			}
		);
	}

	#[test]
	fn parses_resources() {
		let decls = Declarations::parse(SAMPLE).unwrap();
		assert_eq!(decls.resources.get_int(ResourceId(1005)).unwrap(), 12);
		assert_eq!(decls.resources.get_string(ResourceId(1006)).unwrap(), None);
	}

	#[test]
	fn rejects_resource_flag_without_id() {
		let content = r#"
[[flags]]
id = 5
name = "max_tiles"
namespace = "systemui"
category = "resource_int"
"#;
		let err = Declarations::parse(content).unwrap_err();
		assert!(err.to_string().contains("resource_id is required"));
	}

	#[test]
	fn rejects_mistyped_default() {
		let content = r#"
[[flags]]
id = 4
name = "count"
namespace = "systemui"
category = "int"
default = "twelve"
"#;
		assert!(Declarations::parse(content).is_err());
	}

	#[test]
	fn rejects_duplicate_names() {
		let content = r#"
[[flags]]
id = 1
name = "a"
namespace = "x"
category = "released"

[[flags]]
id = 2
name = "a"
namespace = "x"
category = "released"
"#;
		assert!(Declarations::parse(content).is_err());
	}

	#[test]
	fn load_reads_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("flags.toml");
		std::fs::write(&path, SAMPLE).unwrap();
		assert_eq!(Declarations::load(&path).unwrap().registry.len(), 5);
		assert!(Declarations::load(&dir.path().join("missing.toml")).is_err());
	}
}
