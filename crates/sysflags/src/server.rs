// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-pushed overrides.
//!
//! Pushes are always recorded. A restart is requested only when the pushed
//! value changes the effective value of a flag that was already resolved, so
//! a running process never keeps using a value the server has retracted.

use sysflags_core::{FlagValue, Result, ServerFlagChange};
use tracing::{debug, info};

use crate::resolver::FeatureFlags;

/// Result of a server push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerChangeOutcome {
	/// Stored for later reads; the flag has not been resolved yet.
	Recorded,
	/// The flag's effective value did not change.
	Unchanged,
	/// The effective value changed and a restart was requested.
	Restarted,
}

impl FeatureFlags {
	/// Records a server override and restarts when it changes a resolved flag.
	///
	/// If recomputation fails the cache entry stays invalidated and the error
	/// is returned.
	pub fn on_server_value_changed(
		&self,
		namespace: &str,
		name: &str,
		value: FlagValue,
	) -> Result<ServerChangeOutcome> {
		let _guard = self.lock.lock();
		self
			.server
			.write()
			.insert((namespace.to_string(), name.to_string()), value);

		let Some(decl) = self.declaration(namespace, name) else {
			debug!(namespace, flag = %name, "recorded server value for unknown flag");
			return Ok(ServerChangeOutcome::Recorded);
		};
		let Some(previous) = self.cache.remove(&decl.name) else {
			debug!(namespace, flag = %name, "recorded server value for unresolved flag");
			return Ok(ServerChangeOutcome::Recorded);
		};

		let current = self.compute(&decl)?;
		self.cache.insert(&decl.name, current.clone());
		if current == previous {
			debug!(namespace, flag = %name, "server value did not change flag");
			return Ok(ServerChangeOutcome::Unchanged);
		}

		info!(namespace, flag = %name, from = %previous, to = %current, "server changed flag");
		self.invalidate_teamfood_followers(&decl.name);
		self
			.restarter
			.restart(&format!("Server flag change: {namespace}.{name}"));
		Ok(ServerChangeOutcome::Restarted)
	}

	pub fn apply_server_change(&self, change: &ServerFlagChange) -> Result<ServerChangeOutcome> {
		self.on_server_value_changed(&change.namespace, &change.name, change.value.clone())
	}

	/// Returns the recorded server value for `(namespace, name)`.
	pub fn server_override(&self, namespace: &str, name: &str) -> Option<FlagValue> {
		self
			.server
			.read()
			.get(&(namespace.to_string(), name.to_string()))
			.cloned()
	}

	/// Forgets a server record. The flag keeps its cached value until it is
	/// next invalidated.
	pub fn clear_server_override(&self, namespace: &str, name: &str) -> Option<FlagValue> {
		let _guard = self.lock.lock();
		self
			.server
			.write()
			.remove(&(namespace.to_string(), name.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mockall::predicate::eq;
	use sysflags_core::{FlagDeclaration, FlagKind, OverrideCommand};

	use crate::controller::tests::{flags_with, MockSupervisor};

	fn quiet() -> MockSupervisor {
		let mut restarter = MockSupervisor::new();
		restarter.expect_restart().never();
		restarter
	}

	#[test]
	fn uncached_flag_is_only_recorded() {
		let decl = FlagDeclaration::unreleased(100, "100", "test");
		let (_, flags) = flags_with(vec![decl.clone()], quiet());

		let outcome = flags
			.on_server_value_changed("test", "100", FlagValue::Boolean(true))
			.unwrap();
		assert_eq!(outcome, ServerChangeOutcome::Recorded);
		assert!(flags.is_enabled(&decl).unwrap());
	}

	#[test]
	fn undeclared_flag_is_recorded() {
		let (_, flags) = flags_with(vec![], quiet());
		let outcome = flags
			.on_server_value_changed("other", "x", FlagValue::Int(3))
			.unwrap();
		assert_eq!(outcome, ServerChangeOutcome::Recorded);
		assert_eq!(flags.server_override("other", "x"), Some(FlagValue::Int(3)));
	}

	#[test]
	fn changing_a_cached_flag_restarts_once() {
		let mut restarter = MockSupervisor::new();
		restarter
			.expect_restart()
			.with(eq("Server flag change: test.100"))
			.times(1)
			.return_const(());
		let decl = FlagDeclaration::unreleased(100, "100", "test");
		let (_, flags) = flags_with(vec![decl.clone()], restarter);

		assert!(!flags.is_enabled(&decl).unwrap());
		assert_eq!(
			flags
				.on_server_value_changed("test", "100", FlagValue::Boolean(true))
				.unwrap(),
			ServerChangeOutcome::Restarted
		);
		assert!(flags.is_enabled(&decl).unwrap());
		assert_eq!(
			flags
				.on_server_value_changed("test", "100", FlagValue::Boolean(true))
				.unwrap(),
			ServerChangeOutcome::Unchanged
		);
	}

	#[test]
	fn redundant_value_does_not_restart() {
		let decl = FlagDeclaration::released(100, "100", "test");
		let (_, flags) = flags_with(vec![decl.clone()], quiet());

		assert!(flags.is_enabled(&decl).unwrap());
		assert_eq!(
			flags
				.on_server_value_changed("test", "100", FlagValue::Boolean(true))
				.unwrap(),
			ServerChangeOutcome::Unchanged
		);
	}

	#[test]
	fn local_override_masks_server_change() {
		let mut restarter = MockSupervisor::new();
		restarter.expect_restart().times(1).return_const(());
		let decl = FlagDeclaration::int(4, "4", "test", 12);
		let (_, flags) = flags_with(vec![decl.clone()], restarter);

		flags
			.apply_command(&OverrideCommand::set("4", FlagValue::Int(48)))
			.unwrap();
		assert_eq!(flags.get_int(&decl).unwrap(), 48);
		assert_eq!(
			flags
				.on_server_value_changed("test", "4", FlagValue::Int(7))
				.unwrap(),
			ServerChangeOutcome::Unchanged
		);
		assert_eq!(flags.get_int(&decl).unwrap(), 48);
	}

	#[test]
	fn failed_recompute_leaves_entry_invalidated() {
		let decl = FlagDeclaration::resource(5, "5", "test", FlagKind::Boolean, 1005);
		let (_, flags) = flags_with(vec![decl.clone()], quiet());
		flags.cache.insert("5", FlagValue::Boolean(false));

		assert!(flags
			.on_server_value_changed("test", "5", FlagValue::Boolean(true))
			.is_err());
		assert!(!flags.cache().contains("5"));
	}

	#[test]
	fn unregistered_flag_that_was_read_restarts() {
		let mut restarter = MockSupervisor::new();
		restarter
			.expect_restart()
			.with(eq("Server flag change: test.100"))
			.times(1)
			.return_const(());
		let decl = FlagDeclaration::unreleased(100, "100", "test");
		let (_, flags) = flags_with(vec![], restarter);

		assert!(!flags.is_enabled(&decl).unwrap());
		assert_eq!(
			flags
				.on_server_value_changed("test", "100", FlagValue::Boolean(true))
				.unwrap(),
			ServerChangeOutcome::Restarted
		);
		assert!(flags.is_enabled(&decl).unwrap());
	}

	#[test]
	fn registered_teamfood_change_refreshes_followers() {
		let mut restarter = MockSupervisor::new();
		restarter
			.expect_restart()
			.with(eq("Server flag change: systemui.teamfood"))
			.times(1)
			.return_const(());
		let follower = FlagDeclaration::unreleased(500, "a", "test").with_teamfood();
		let (_, flags) = flags_with(vec![FlagDeclaration::teamfood(), follower.clone()], restarter);

		assert!(!flags.is_enabled(&follower).unwrap());
		assert_eq!(
			flags
				.on_server_value_changed("systemui", "teamfood", FlagValue::Boolean(true))
				.unwrap(),
			ServerChangeOutcome::Restarted
		);
		assert!(!flags.cache().contains("a"));
		assert!(flags.is_enabled(&follower).unwrap());
	}

	#[test]
	fn built_in_teamfood_change_refreshes_followers() {
		let mut restarter = MockSupervisor::new();
		restarter
			.expect_restart()
			.with(eq("Server flag change: systemui.teamfood"))
			.times(1)
			.return_const(());
		let follower = FlagDeclaration::unreleased(500, "a", "test").with_teamfood();
		let plain = FlagDeclaration::unreleased(501, "b", "test");
		let (_, flags) = flags_with(vec![follower.clone(), plain.clone()], restarter);

		assert!(!flags.is_enabled(&follower).unwrap());
		assert!(!flags.is_enabled(&plain).unwrap());
		assert_eq!(
			flags
				.on_server_value_changed("systemui", "teamfood", FlagValue::Boolean(true))
				.unwrap(),
			ServerChangeOutcome::Restarted
		);
		assert!(flags.is_enabled(&follower).unwrap());
		assert!(flags.cache().contains("b"));
		assert!(!flags.is_enabled(&plain).unwrap());
	}

	#[test]
	fn concurrent_reads_never_cache_a_retracted_value() {
		let mut restarter = MockSupervisor::new();
		restarter.expect_restart().return_const(());
		let decl = FlagDeclaration::int(4, "4", "test", 12);
		let (_, flags) = flags_with(vec![decl.clone()], restarter);
		assert_eq!(flags.get_int(&decl).unwrap(), 12);

		std::thread::scope(|s| {
			s.spawn(|| {
				for value in 100..=300 {
					flags
						.on_server_value_changed("test", "4", FlagValue::Int(value))
						.unwrap();
				}
			});
			s.spawn(|| {
				for _ in 0..500 {
					let value = flags.get_int(&decl).unwrap();
					assert!(value == 12 || (100..=300).contains(&value));
				}
			});
		});

		assert_eq!(flags.cache().get("4"), Some(FlagValue::Int(300)));
		assert_eq!(flags.get_int(&decl).unwrap(), 300);
	}

	#[test]
	fn clearing_a_record() {
		let (_, flags) = flags_with(vec![], quiet());
		flags
			.apply_server_change(&ServerFlagChange::new("test", "a", FlagValue::Boolean(true)))
			.unwrap();
		assert_eq!(
			flags.clear_server_override("test", "a"),
			Some(FlagValue::Boolean(true))
		);
		assert_eq!(flags.server_override("test", "a"), None);
	}
}
