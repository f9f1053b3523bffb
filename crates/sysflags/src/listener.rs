// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Listeners notified after a flag's local override changed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle returned by registration, used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event handed to listeners of a changed flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChangeEvent {
	flag_name: String,
	no_restart_requested: bool,
}

impl FlagChangeEvent {
	pub fn new(flag_name: impl Into<String>) -> Self {
		Self {
			flag_name: flag_name.into(),
			no_restart_requested: false,
		}
	}

	pub fn flag_name(&self) -> &str {
		&self.flag_name
	}

	/// Tells the resolver this listener applied the change live.
	pub fn request_no_restart(&mut self) {
		self.no_restart_requested = true;
	}

	pub fn no_restart_requested(&self) -> bool {
		self.no_restart_requested
	}
}

/// Callback for flag changes.
///
/// Listeners run synchronously on the thread that committed the change and
/// may read flags from the resolver, which already reflects the new value.
pub trait FlagListener: Send + Sync {
	fn on_flag_changed(&self, event: &mut FlagChangeEvent);
}

impl<F> FlagListener for F
where
	F: Fn(&mut FlagChangeEvent) + Send + Sync,
{
	fn on_flag_changed(&self, event: &mut FlagChangeEvent) {
		self(event)
	}
}

/// Listeners registered per flag name.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
	next_id: AtomicU64,
	listeners: Mutex<HashMap<String, Vec<(ListenerId, Arc<dyn FlagListener>)>>>,
}

impl ListenerRegistry {
	pub(crate) fn add(&self, flag_name: &str, listener: Arc<dyn FlagListener>) -> ListenerId {
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
		self
			.listeners
			.lock()
			.entry(flag_name.to_string())
			.or_default()
			.push((id, listener));
		id
	}

	pub(crate) fn remove(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.lock();
		let mut removed = false;
		for entries in listeners.values_mut() {
			let before = entries.len();
			entries.retain(|(existing, _)| *existing != id);
			removed |= entries.len() != before;
		}
		listeners.retain(|_, entries| !entries.is_empty());
		removed
	}

	/// Notifies every listener of `flag_name` and returns whether a restart
	/// is still needed: true unless at least one listener is registered and
	/// all of them requested no restart.
	pub(crate) fn dispatch(&self, flag_name: &str) -> bool {
		// Snapshot so listeners can register or remove listeners re-entrantly.
		let listeners: Vec<Arc<dyn FlagListener>> = self
			.listeners
			.lock()
			.get(flag_name)
			.map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
			.unwrap_or_default();

		if listeners.is_empty() {
			return true;
		}

		let mut restart = false;
		for listener in listeners {
			let mut event = FlagChangeEvent::new(flag_name);
			listener.on_flag_changed(&mut event);
			restart |= !event.no_restart_requested();
		}
		restart
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize;

	#[test]
	fn no_listeners_means_restart() {
		let registry = ListenerRegistry::default();
		assert!(registry.dispatch("1"));
	}

	#[test]
	fn all_listeners_must_veto_restart() {
		let registry = ListenerRegistry::default();
		registry.add("1", Arc::new(|e: &mut FlagChangeEvent| e.request_no_restart()));
		assert!(!registry.dispatch("1"));

		registry.add("1", Arc::new(|_: &mut FlagChangeEvent| {}));
		assert!(registry.dispatch("1"));
	}

	#[test]
	fn listeners_only_see_their_flag() {
		let registry = ListenerRegistry::default();
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		registry.add(
			"1",
			Arc::new(move |e: &mut FlagChangeEvent| {
				assert_eq!(e.flag_name(), "1");
				counter.fetch_add(1, Ordering::SeqCst);
			}),
		);

		registry.dispatch("2");
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		registry.dispatch("1");
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn removed_listener_is_not_called() {
		let registry = ListenerRegistry::default();
		let id = registry.add("1", Arc::new(|e: &mut FlagChangeEvent| e.request_no_restart()));
		assert!(registry.remove(id));
		assert!(!registry.remove(id));
		assert!(registry.dispatch("1"));
	}
}
