// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process restart capability.
//!
//! The resolver asks for a restart whenever a flag's effective value changed
//! in a way running code may already have observed. Requests are
//! fire-and-forget: [`Restarter::restart`] must return without waiting for the
//! restart to happen.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Receives restart requests from the resolver.
pub trait Restarter: Send + Sync {
	/// Requests a restart. `reason` is human readable and names the flag.
	fn restart(&self, reason: &str);
}

/// Type alias for a shared restarter.
pub type SharedRestarter = Arc<dyn Restarter>;

/// A restarter that only logs the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRestarter;

impl Restarter for LoggingRestarter {
	fn restart(&self, reason: &str) {
		info!(reason, "restart requested");
	}
}

/// A restart request forwarded by [`ChannelRestarter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
	pub reason: String,
}

/// Forwards restart requests to a process supervisor over a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelRestarter {
	tx: mpsc::UnboundedSender<RestartRequest>,
}

impl ChannelRestarter {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<RestartRequest>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl Restarter for ChannelRestarter {
	fn restart(&self, reason: &str) {
		let request = RestartRequest {
			reason: reason.to_string(),
		};
		if self.tx.send(request).is_err() {
			warn!(reason, "restart receiver dropped, request discarded");
		}
	}
}
