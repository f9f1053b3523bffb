// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Events delivered to the resolver by external channels.
//!
//! - [`OverrideCommand`] - local set/clear command, usually arriving as JSON:
//!   `{"action":"set","flag_name":"3","value":"foo"}`
//! - [`ServerFlagChange`] - value pushed by the remote control-plane

use serde::{Deserialize, Serialize};

use crate::flag::FlagValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
	Set,
	Clear,
}

/// A request to set or clear the local override of a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideCommand {
	pub action: CommandAction,
	pub flag_name: Option<String>,
	pub value: Option<FlagValue>,
}

/// Untyped payload as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
	Bool(bool),
	Int(i64),
	Str(String),
}

#[derive(Debug, Deserialize)]
struct RawCommand {
	action: CommandAction,
	#[serde(default)]
	flag_name: Option<String>,
	#[serde(default)]
	value: Option<RawValue>,
}

impl OverrideCommand {
	pub fn set(flag_name: impl Into<String>, value: FlagValue) -> Self {
		Self {
			action: CommandAction::Set,
			flag_name: Some(flag_name.into()),
			value: Some(value),
		}
	}

	pub fn clear(flag_name: impl Into<String>) -> Self {
		Self {
			action: CommandAction::Clear,
			flag_name: Some(flag_name.into()),
			value: None,
		}
	}

	/// Parses a raw JSON command. Returns `None` for malformed payloads,
	/// including integers outside the `i32` range.
	pub fn parse(raw: &str) -> Option<Self> {
		let raw: RawCommand = serde_json::from_str(raw).ok()?;
		let value = match raw.value {
			None => None,
			Some(RawValue::Bool(b)) => Some(FlagValue::Boolean(b)),
			Some(RawValue::Int(i)) => Some(FlagValue::Int(i32::try_from(i).ok()?)),
			Some(RawValue::Str(s)) => Some(FlagValue::String(s)),
		};
		Some(Self {
			action: raw.action,
			flag_name: raw.flag_name,
			value,
		})
	}

	/// True when the command erases the override instead of writing one.
	pub fn is_erase(&self) -> bool {
		self.action == CommandAction::Clear || self.value.is_none()
	}
}

/// A server-pushed value for the flag identified by `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFlagChange {
	pub namespace: String,
	pub name: String,
	pub value: FlagValue,
}

impl ServerFlagChange {
	pub fn new(namespace: impl Into<String>, name: impl Into<String>, value: FlagValue) -> Self {
		Self {
			namespace: namespace.into(),
			name: name.into(),
			value,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_typed_values() {
		let cmd = OverrideCommand::parse(r#"{"action":"set","flag_name":"1","value":false}"#).unwrap();
		assert_eq!(cmd, OverrideCommand::set("1", FlagValue::Boolean(false)));

		let cmd = OverrideCommand::parse(r#"{"action":"set","flag_name":"2","value":123}"#).unwrap();
		assert_eq!(cmd.value, Some(FlagValue::Int(123)));

		let cmd = OverrideCommand::parse(r#"{"action":"set","flag_name":"3","value":"foo"}"#).unwrap();
		assert_eq!(cmd.value, Some(FlagValue::String("foo".to_string())));
	}

	#[test]
	fn missing_value_erases() {
		let cmd = OverrideCommand::parse(r#"{"action":"set","flag_name":"1"}"#).unwrap();
		assert!(cmd.is_erase());
		assert!(OverrideCommand::clear("1").is_erase());
		assert!(!OverrideCommand::set("1", FlagValue::Int(1)).is_erase());
	}

	#[test]
	fn malformed_payloads_are_rejected() {
		assert!(OverrideCommand::parse("").is_none());
		assert!(OverrideCommand::parse("{}").is_none());
		assert!(OverrideCommand::parse(r#"{"action":"invalid action"}"#).is_none());
		assert!(OverrideCommand::parse(r#"{"action":"set","value":[1,2]}"#).is_none());
		assert!(
			OverrideCommand::parse(r#"{"action":"set","flag_name":"1","value":4294967296}"#)
				.is_none()
		);
	}

	#[test]
	fn action_without_name_still_parses() {
		let cmd = OverrideCommand::parse(r#"{"action":"set"}"#).unwrap();
		assert_eq!(cmd.flag_name, None);
	}

	#[test]
	fn server_change_serializes_value_envelope() {
		let change = ServerFlagChange::new("test", "100", FlagValue::Boolean(true));
		let json = serde_json::to_string(&change).unwrap();
		assert_eq!(
			json,
			r#"{"namespace":"test","name":"100","value":{"type":"boolean","value":true}}"#
		);
	}
}
