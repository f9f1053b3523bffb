// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::error::{FlagsError, Result};

/// Name of the teamfood group flag.
pub const TEAMFOOD_FLAG_NAME: &str = "teamfood";

/// Stable numeric identifier of a declared flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlagId(pub u32);

impl std::fmt::Display for FlagId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Identifier of a value in the resource source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl std::fmt::Display for ResourceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Type tag of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
	Boolean,
	Int,
	String,
}

impl FlagKind {
	/// Discriminator used in the persisted envelope.
	pub fn as_str(&self) -> &'static str {
		match self {
			FlagKind::Boolean => "boolean",
			FlagKind::Int => "int",
			FlagKind::String => "string",
		}
	}
}

impl std::fmt::Display for FlagKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The value of a flag.
///
/// Serializes as the `{"type": ..., "value": ...}` envelope stored in the
/// settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FlagValue {
	#[serde(rename = "boolean")]
	Boolean(bool),
	#[serde(rename = "int")]
	Int(i32),
	#[serde(rename = "string")]
	String(String),
}

impl FlagValue {
	pub fn kind(&self) -> FlagKind {
		match self {
			FlagValue::Boolean(_) => FlagKind::Boolean,
			FlagValue::Int(_) => FlagKind::Int,
			FlagValue::String(_) => FlagKind::String,
		}
	}

	/// Returns the value as a boolean if it is one.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			FlagValue::Boolean(b) => Some(*b),
			_ => None,
		}
	}

	/// Returns the value as an integer if it is one.
	pub fn as_int(&self) -> Option<i32> {
		match self {
			FlagValue::Int(i) => Some(*i),
			_ => None,
		}
	}

	/// Returns the value as a string if it is one.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			FlagValue::String(s) => Some(s),
			_ => None,
		}
	}

	/// Parses user input (for example a CLI argument) as a value of `kind`.
	pub fn parse_as(kind: FlagKind, input: &str) -> Result<FlagValue> {
		match kind {
			FlagKind::Boolean => match input.trim() {
				"true" | "1" => Ok(FlagValue::Boolean(true)),
				"false" | "0" => Ok(FlagValue::Boolean(false)),
				other => Err(FlagsError::Serialization(format!(
					"'{other}' is not a boolean"
				))),
			},
			FlagKind::Int => input
				.trim()
				.parse()
				.map(FlagValue::Int)
				.map_err(|e| FlagsError::Serialization(format!("'{input}' is not an int: {e}"))),
			FlagKind::String => Ok(FlagValue::String(input.to_string())),
		}
	}
}

impl std::fmt::Display for FlagValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FlagValue::Boolean(b) => write!(f, "{b}"),
			FlagValue::Int(i) => write!(f, "{i}"),
			FlagValue::String(s) => f.write_str(s),
		}
	}
}

/// Where the base value of a flag comes from, before any override applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FlagDefault {
	/// Compiled default.
	Value { value: FlagValue },
	/// Looked up in the resource source on every uncached resolution.
	Resource { kind: FlagKind, resource_id: ResourceId },
	/// Boolean read from a system property, falling back to `default`.
	SystemProperty { property: String, default: bool },
}

impl FlagDefault {
	pub fn kind(&self) -> FlagKind {
		match self {
			FlagDefault::Value { value } => value.kind(),
			FlagDefault::Resource { kind, .. } => *kind,
			FlagDefault::SystemProperty { .. } => FlagKind::Boolean,
		}
	}
}

/// Static declaration of a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDeclaration {
	pub id: FlagId,
	/// Unique key; also the persisted override key.
	pub name: String,
	pub namespace: String,
	pub default: FlagDefault,
	/// Participates in the teamfood group flag.
	#[serde(default)]
	pub teamfood: bool,
}

impl FlagDeclaration {
	pub fn new(
		id: u32,
		name: impl Into<String>,
		namespace: impl Into<String>,
		default: FlagDefault,
	) -> Self {
		Self {
			id: FlagId(id),
			name: name.into(),
			namespace: namespace.into(),
			default,
			teamfood: false,
		}
	}

	/// A boolean flag that defaults to on.
	pub fn released(id: u32, name: impl Into<String>, namespace: impl Into<String>) -> Self {
		Self::new(
			id,
			name,
			namespace,
			FlagDefault::Value {
				value: FlagValue::Boolean(true),
			},
		)
	}

	/// A boolean flag that defaults to off.
	pub fn unreleased(id: u32, name: impl Into<String>, namespace: impl Into<String>) -> Self {
		Self::new(
			id,
			name,
			namespace,
			FlagDefault::Value {
				value: FlagValue::Boolean(false),
			},
		)
	}

	pub fn string(
		id: u32,
		name: impl Into<String>,
		namespace: impl Into<String>,
		default: impl Into<String>,
	) -> Self {
		Self::new(
			id,
			name,
			namespace,
			FlagDefault::Value {
				value: FlagValue::String(default.into()),
			},
		)
	}

	pub fn int(id: u32, name: impl Into<String>, namespace: impl Into<String>, default: i32) -> Self {
		Self::new(
			id,
			name,
			namespace,
			FlagDefault::Value {
				value: FlagValue::Int(default),
			},
		)
	}

	pub fn resource(
		id: u32,
		name: impl Into<String>,
		namespace: impl Into<String>,
		kind: FlagKind,
		resource_id: u32,
	) -> Self {
		Self::new(
			id,
			name,
			namespace,
			FlagDefault::Resource {
				kind,
				resource_id: ResourceId(resource_id),
			},
		)
	}

	/// A boolean flag backed by the system property of the same name.
	pub fn sysprop(
		id: u32,
		name: impl Into<String>,
		namespace: impl Into<String>,
		default: bool,
	) -> Self {
		let name = name.into();
		let property = name.clone();
		Self::new(
			id,
			name,
			namespace,
			FlagDefault::SystemProperty { property, default },
		)
	}

	/// The built-in teamfood group flag.
	pub fn teamfood() -> Self {
		Self::unreleased(1, TEAMFOOD_FLAG_NAME, "systemui")
	}

	pub fn with_teamfood(mut self) -> Self {
		self.teamfood = true;
		self
	}

	pub fn kind(&self) -> FlagKind {
		self.default.kind()
	}

	/// True when the teamfood group flag may switch this flag on.
	pub fn is_teamfood_eligible(&self) -> bool {
		self.teamfood
			&& matches!(
				self.default,
				FlagDefault::Value {
					value: FlagValue::Boolean(_)
				}
			)
	}
}
