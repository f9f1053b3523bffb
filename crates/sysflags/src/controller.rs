// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local override commands.

use sysflags_core::{FlagsError, OverrideCommand, Result};
use tracing::{debug, info, warn};

use crate::resolver::FeatureFlags;

/// Why a command was dropped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
	MissingName,
	UnknownFlag,
	KindMismatch,
}

/// Result of applying an [`OverrideCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
	Ignored(IgnoreReason),
	/// The persisted override already held the value.
	Unchanged,
	Written,
	Cleared,
}

impl FeatureFlags {
	/// Applies a local set or clear command.
	///
	/// A committed change is persisted first, then the cache entry is dropped,
	/// then listeners run and finally a restart is requested unless every
	/// listener of the flag opted out.
	pub fn apply_command(&self, command: &OverrideCommand) -> Result<CommandOutcome> {
		let name = match command.flag_name.as_deref() {
			Some(name) if !name.is_empty() => name,
			_ => {
				debug!("ignoring command without a flag name");
				return Ok(CommandOutcome::Ignored(IgnoreReason::MissingName));
			}
		};
		let Some(decl) = self.registry.get(name).cloned() else {
			debug!(flag = %name, "ignoring command for unknown flag");
			return Ok(CommandOutcome::Ignored(IgnoreReason::UnknownFlag));
		};

		let _guard = self.lock.lock();

		let value = match &command.value {
			Some(value) if !command.is_erase() => value,
			_ => {
				self.overrides.erase_flag_value(&decl.name)?;
				info!(flag = %decl.name, "local override cleared");
				self.commit_change(&decl.name);
				return Ok(CommandOutcome::Cleared);
			}
		};

		if value.kind() != decl.kind() {
			debug!(
				flag = %decl.name,
				expected = %decl.kind(),
				actual = %value.kind(),
				"ignoring command with a value of the wrong kind"
			);
			return Ok(CommandOutcome::Ignored(IgnoreReason::KindMismatch));
		}

		let current = match self.local_override(&decl) {
			Err(FlagsError::Serialization(message)) => {
				warn!(flag = %decl.name, %message, "overwriting undecodable local override");
				None
			}
			other => other?,
		};
		if current.as_ref() == Some(value) {
			debug!(flag = %decl.name, "local override unchanged");
			return Ok(CommandOutcome::Unchanged);
		}

		self.overrides.write_flag_value(&decl.name, value)?;
		info!(flag = %decl.name, %value, "local override written");
		self.commit_change(&decl.name);
		Ok(CommandOutcome::Written)
	}

	/// Parses and applies a raw JSON command. Malformed payloads are ignored.
	pub fn apply_raw_command(&self, raw: &str) -> Result<Option<CommandOutcome>> {
		match OverrideCommand::parse(raw) {
			Some(command) => self.apply_command(&command).map(Some),
			None => {
				debug!(raw, "ignoring malformed command");
				Ok(None)
			}
		}
	}

	/// Reacts to another writer changing the persisted override of `name`.
	///
	/// Returns false when `name` is not a declared flag.
	pub fn on_settings_changed(&self, name: &str) -> bool {
		let Some(decl) = self.registry.get(name).cloned() else {
			debug!(flag = %name, "ignoring settings change for unknown flag");
			return false;
		};
		let _guard = self.lock.lock();
		debug!(flag = %decl.name, "settings changed externally");
		self.commit_change(&decl.name);
		true
	}

	fn commit_change(&self, name: &str) {
		self.cache.remove(name);
		self.invalidate_teamfood_followers(name);
		if self.listeners.dispatch(name) {
			self.restarter.restart(&format!("Flag change: {name}"));
		} else {
			debug!(flag = %name, "listeners applied change without restart");
		}
	}
}
