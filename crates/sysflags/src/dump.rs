// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Diagnostics.

use std::fmt::Write;
use std::sync::Arc;

use sysflags_core::{FlagDeclaration, FlagValue, FlagsError, Result};

use crate::resolver::FeatureFlags;

/// State of one declared flag, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSnapshot {
	pub declaration: Arc<FlagDeclaration>,
	/// Effective value, or the resolution error.
	pub value: Result<FlagValue>,
	pub local_override: Option<FlagValue>,
	pub server_override: Option<FlagValue>,
}

impl FeatureFlags {
	/// Writes one line per declared flag, ordered by id.
	///
	/// Values are resolved through the normal read path, so dumping populates
	/// the cache. The first resolution error aborts the dump.
	pub fn dump<W: Write>(&self, out: &mut W) -> Result<()> {
		let prefix = &self.config.dump_key_prefix;
		for decl in self.registry.iter() {
			let value = self.get_value(decl)?;
			match &value {
				FlagValue::String(s) => writeln!(
					out,
					" {prefix}{}: [length={}] \"{s}\"",
					decl.id,
					s.chars().count()
				)?,
				other => writeln!(out, " {prefix}{}: {other}", decl.id)?,
			}
		}
		Ok(())
	}

	pub fn dump_to_string(&self) -> Result<String> {
		let mut out = String::new();
		self.dump(&mut out)?;
		Ok(out)
	}

	/// Returns the state of every declared flag, ordered by id.
	pub fn snapshot(&self) -> Result<Vec<FlagSnapshot>> {
		self
			.registry
			.iter()
			.map(|decl| {
				Ok(FlagSnapshot {
					declaration: Arc::clone(decl),
					value: self.get_value(decl),
					local_override: match self.local_override(decl) {
						// Already reported through `value`.
						Err(FlagsError::Serialization(_)) => None,
						other => other?,
					},
					server_override: self.server_override(&decl.namespace, &decl.name),
				})
			})
			.collect()
	}
}
