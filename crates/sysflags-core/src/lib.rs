// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the sysflags feature flag resolver.
//!
//! This crate holds the pieces that do no I/O: flag declarations, the typed
//! value union, the settings-store encoding, the declaration registry and the
//! events external channels deliver. The resolver itself lives in `sysflags`.
//!
//! # Example
//!
//! ```
//! use sysflags_core::{serializer, FlagDeclaration, FlagRegistry, FlagValue};
//!
//! let registry = FlagRegistry::new([
//!     FlagDeclaration::teamfood(),
//!     FlagDeclaration::string(3, "3", "test", "buz"),
//! ])
//! .unwrap();
//! assert_eq!(registry.len(), 2);
//!
//! let data = serializer::encode(&FlagValue::String("foo".to_string())).unwrap();
//! assert_eq!(data, r#"{"type":"string","value":"foo"}"#);
//! ```

pub mod error;
pub mod event;
pub mod flag;
pub mod registry;
pub mod serializer;

pub use error::{FlagsError, Result};
pub use event::{CommandAction, OverrideCommand, ServerFlagChange};
pub use flag::{
	FlagDeclaration, FlagDefault, FlagId, FlagKind, FlagValue, ResourceId, TEAMFOOD_FLAG_NAME,
};
pub use registry::FlagRegistry;
pub use serializer::FlagSerializer;
