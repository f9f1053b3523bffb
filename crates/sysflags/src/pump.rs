// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background tasks that feed external events into the resolver.
//!
//! Each pump runs until its channel closes.

use std::sync::Arc;

use sysflags_core::ServerFlagChange;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::resolver::FeatureFlags;

/// Spawns a task applying raw JSON override commands.
///
/// Malformed payloads are dropped.
pub fn spawn_command_listener(
	flags: Arc<FeatureFlags>,
	mut commands: mpsc::Receiver<String>,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		while let Some(raw) = commands.recv().await {
			match flags.apply_raw_command(&raw) {
				Ok(Some(outcome)) => debug!(?outcome, "command applied"),
				Ok(None) => {}
				Err(e) => error!(error = %e, "failed to apply command"),
			}
		}
		info!("command channel closed, stopping listener");
	})
}

/// Spawns a task applying server-pushed values.
pub fn spawn_server_listener(
	flags: Arc<FeatureFlags>,
	mut changes: mpsc::Receiver<ServerFlagChange>,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		while let Some(change) = changes.recv().await {
			match flags.apply_server_change(&change) {
				Ok(outcome) => debug!(
					namespace = %change.namespace,
					flag = %change.name,
					?outcome,
					"server change applied"
				),
				Err(e) => error!(
					namespace = %change.namespace,
					flag = %change.name,
					error = %e,
					"failed to apply server change"
				),
			}
		}
		info!("server channel closed, stopping listener");
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use sysflags_core::{FlagDeclaration, FlagRegistry, FlagValue};

	use crate::restart::ChannelRestarter;
	use crate::server::ServerChangeOutcome;

	#[tokio::test]
	async fn command_listener_applies_valid_commands() {
		let decl = FlagDeclaration::string(3, "3", "test", "buz");
		let (restarter, mut restarts) = ChannelRestarter::new();
		let flags = Arc::new(
			FeatureFlags::builder(FlagRegistry::new([decl.clone()]).unwrap())
				.restarter(restarter)
				.build(),
		);

		let (tx, rx) = mpsc::channel(8);
		let handle = spawn_command_listener(Arc::clone(&flags), rx);
		tx.send("not json".to_string()).await.unwrap();
		tx.send(r#"{"action":"set","flag_name":"3","value":"foo"}"#.to_string())
			.await
			.unwrap();
		drop(tx);
		handle.await.unwrap();

		assert_eq!(flags.get_string(&decl).unwrap(), "foo");
		assert_eq!(restarts.recv().await.unwrap().reason, "Flag change: 3");
		assert!(restarts.try_recv().is_err());
	}

	#[tokio::test]
	async fn server_listener_restarts_on_cached_change() {
		let decl = FlagDeclaration::unreleased(100, "100", "test");
		let (restarter, mut restarts) = ChannelRestarter::new();
		let flags = Arc::new(
			FeatureFlags::builder(FlagRegistry::new([decl.clone()]).unwrap())
				.restarter(restarter)
				.build(),
		);
		assert!(!flags.is_enabled(&decl).unwrap());

		let (tx, rx) = mpsc::channel(8);
		let handle = spawn_server_listener(Arc::clone(&flags), rx);
		tx.send(ServerFlagChange::new("test", "100", FlagValue::Boolean(true)))
			.await
			.unwrap();
		drop(tx);
		handle.await.unwrap();

		assert!(flags.is_enabled(&decl).unwrap());
		assert_eq!(
			restarts.recv().await.unwrap().reason,
			"Server flag change: test.100"
		);
		assert_eq!(
			flags
				.on_server_value_changed("test", "100", FlagValue::Boolean(true))
				.unwrap(),
			ServerChangeOutcome::Unchanged
		);
	}
}
