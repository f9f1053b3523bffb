// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime feature flag resolution.
//!
//! This crate resolves the effective value of statically declared flags from
//! compiled defaults, resources, system properties, persisted local overrides
//! and server-pushed overrides, and caches the result per flag.
//!
//! # Features
//!
//! - Cached resolution with write-through invalidation
//! - Local override commands with persisted JSON envelopes
//! - Server overrides that restart the process only when a resolved value changes
//! - Per-flag listeners that can apply a change live instead of restarting
//! - Teamfood group flag for opting eligible flags in together
//! - Diagnostic dump and snapshots
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sysflags::{FeatureFlags, InMemorySettingsStore, LoggingRestarter};
//! use sysflags_core::{FlagDeclaration, FlagRegistry, FlagValue, OverrideCommand};
//!
//! let greeting = FlagDeclaration::string(3, "greeting", "demo", "hello");
//! let registry = FlagRegistry::new([greeting.clone()]).unwrap();
//!
//! let flags = FeatureFlags::builder(registry)
//!     .settings(Arc::new(InMemorySettingsStore::new()))
//!     .restarter(LoggingRestarter)
//!     .build();
//!
//! assert_eq!(flags.get_string(&greeting).unwrap(), "hello");
//!
//! flags
//!     .apply_command(&OverrideCommand::set("greeting", FlagValue::String("hi".into())))
//!     .unwrap();
//! assert_eq!(flags.get_string(&greeting).unwrap(), "hi");
//! ```

pub mod cache;
pub mod config;
pub mod controller;
pub mod dump;
pub mod listener;
pub mod pump;
pub mod resolver;
pub mod restart;
pub mod server;
pub mod sources;
pub mod store;

pub use cache::ResolutionCache;
pub use config::{
	load_config, load_from_sources, ConfigError, ConfigSource, DefaultsSource, EnvSource,
	FlagsConfig, FlagsConfigLayer, OverridePrecedence, Precedence, TomlSource,
};
pub use controller::{CommandOutcome, IgnoreReason};
pub use dump::FlagSnapshot;
pub use listener::{FlagChangeEvent, FlagListener, ListenerId};
pub use pump::{spawn_command_listener, spawn_server_listener};
pub use resolver::{FeatureFlags, FeatureFlagsBuilder};
pub use restart::{ChannelRestarter, LoggingRestarter, RestartRequest, Restarter, SharedRestarter};
pub use server::ServerChangeOutcome;
pub use sources::{
	EnvSystemProperties, NoResources, ResourceSource, StaticResources, StaticSystemProperties,
	SystemProperties,
};
pub use store::{InMemorySettingsStore, JsonFileSettingsStore, OverrideStore, SettingsStore, UserScope};

pub use sysflags_core::{FlagsError, Result};
