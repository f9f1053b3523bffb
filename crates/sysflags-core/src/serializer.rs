// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encoding of flag values for the settings store.
//!
//! Values are stored as a small JSON envelope carrying a type discriminator
//! and the value:
//!
//! ```
//! use sysflags_core::{serializer, FlagKind, FlagValue};
//!
//! let data = serializer::encode(&FlagValue::Boolean(false)).unwrap();
//! assert_eq!(data, r#"{"type":"boolean","value":false}"#);
//!
//! let value = serializer::decode(FlagKind::Boolean, &data).unwrap();
//! assert_eq!(value, FlagValue::Boolean(false));
//! ```
//!
//! The empty string is reserved for "no override" and never decodes to a value.

use crate::error::{FlagsError, Result};
use crate::flag::{FlagKind, FlagValue};

/// Encodes and decodes the values of one flag kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSerializer {
	kind: FlagKind,
}

impl FlagSerializer {
	pub const BOOLEAN: FlagSerializer = FlagSerializer {
		kind: FlagKind::Boolean,
	};
	pub const INT: FlagSerializer = FlagSerializer {
		kind: FlagKind::Int,
	};
	pub const STRING: FlagSerializer = FlagSerializer {
		kind: FlagKind::String,
	};

	/// Returns the serializer registered for `kind`.
	pub fn for_kind(kind: FlagKind) -> &'static FlagSerializer {
		match kind {
			FlagKind::Boolean => &Self::BOOLEAN,
			FlagKind::Int => &Self::INT,
			FlagKind::String => &Self::STRING,
		}
	}

	pub fn kind(&self) -> FlagKind {
		self.kind
	}

	/// Encodes `value` into its settings representation.
	pub fn to_settings_data(&self, value: &FlagValue) -> Result<String> {
		if value.kind() != self.kind {
			return Err(FlagsError::Serialization(format!(
				"cannot encode {} value with the {} serializer",
				value.kind(),
				self.kind
			)));
		}
		Ok(serde_json::to_string(value)?)
	}

	/// Decodes settings data. Empty data means no value is stored.
	pub fn from_settings_data(&self, data: &str) -> Result<Option<FlagValue>> {
		if data.is_empty() {
			return Ok(None);
		}

		let envelope: serde_json::Value = serde_json::from_str(data)?;
		let discriminator = envelope
			.get("type")
			.and_then(|t| t.as_str())
			.ok_or_else(|| FlagsError::Serialization(format!("missing type in '{data}'")))?;
		if discriminator != self.kind.as_str() {
			return Err(FlagsError::Serialization(format!(
				"stored {discriminator} value where {} was expected",
				self.kind
			)));
		}

		let value: FlagValue = serde_json::from_value(envelope)?;
		Ok(Some(value))
	}
}

/// Encodes a value using the serializer for its own kind.
pub fn encode(value: &FlagValue) -> Result<String> {
	FlagSerializer::for_kind(value.kind()).to_settings_data(value)
}

/// Decodes `data` as a value of `kind`.
pub fn decode(kind: FlagKind, data: &str) -> Result<FlagValue> {
	FlagSerializer::for_kind(kind)
		.from_settings_data(data)?
		.ok_or_else(|| FlagsError::Serialization("no value stored".to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn encodes_envelopes() {
		assert_eq!(
			encode(&FlagValue::Boolean(true)).unwrap(),
			r#"{"type":"boolean","value":true}"#
		);
		assert_eq!(
			encode(&FlagValue::String("override1".to_string())).unwrap(),
			r#"{"type":"string","value":"override1"}"#
		);
		assert_eq!(
			encode(&FlagValue::Int(22)).unwrap(),
			r#"{"type":"int","value":22}"#
		);
	}

	#[test]
	fn round_trips_representative_values() {
		let values = [
			FlagValue::Boolean(false),
			FlagValue::Boolean(true),
			FlagValue::Int(0),
			FlagValue::Int(234),
			FlagValue::String(String::new()),
			FlagValue::String("flag5default".to_string()),
		];
		for value in values {
			let data = encode(&value).unwrap();
			assert_eq!(decode(value.kind(), &data).unwrap(), value);
		}
	}

	#[test]
	fn rejects_mismatched_discriminator() {
		let data = encode(&FlagValue::Boolean(true)).unwrap();
		let err = decode(FlagKind::String, &data).unwrap_err();
		assert!(matches!(err, FlagsError::Serialization(_)));
	}

	#[test]
	fn rejects_unparseable_payload() {
		assert!(decode(FlagKind::Int, r#"{"type":"int","value":"x"}"#).is_err());
		assert!(decode(FlagKind::Int, "not json").is_err());
		assert!(decode(FlagKind::Int, r#"{"value":3}"#).is_err());
	}

	#[test]
	fn empty_data_is_absent() {
		assert_eq!(FlagSerializer::STRING.from_settings_data("").unwrap(), None);
		assert!(decode(FlagKind::String, "").is_err());
	}

	#[test]
	fn serializer_refuses_foreign_kind() {
		assert!(FlagSerializer::INT
			.to_settings_data(&FlagValue::Boolean(false))
			.is_err());
		assert_eq!(FlagSerializer::for_kind(FlagKind::Int).kind(), FlagKind::Int);
	}
}
