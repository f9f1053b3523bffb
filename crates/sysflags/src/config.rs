// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolver configuration.
//!
//! Layered from multiple sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML config file
//! 3. Environment variables (`SYSFLAGS_*`)
//!
//! ```toml
//! precedence = "server_first"
//! settings_key_prefix = "sysflags/"
//! dump_key_prefix = "sysui_flag_"
//! teamfood_flag_name = "teamfood"
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sysflags_core::TEAMFOOD_FLAG_NAME;
use tracing::{debug, trace};

pub const DEFAULT_SETTINGS_KEY_PREFIX: &str = "sysflags/";
pub const DEFAULT_DUMP_KEY_PREFIX: &str = "sysui_flag_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("Failed to parse TOML config at {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Which override layer wins when both a local and a server override exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePrecedence {
	#[default]
	LocalFirst,
	ServerFirst,
}

impl FromStr for OverridePrecedence {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().replace('-', "_").as_str() {
			"local_first" | "local" => Ok(OverridePrecedence::LocalFirst),
			"server_first" | "server" => Ok(OverridePrecedence::ServerFirst),
			other => Err(format!("unknown precedence '{other}'")),
		}
	}
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagsConfig {
	pub precedence: OverridePrecedence,
	/// Prefix of the settings key under which a local override is persisted.
	pub settings_key_prefix: String,
	/// Prefix of each line key in the diagnostic dump.
	pub dump_key_prefix: String,
	pub teamfood_flag_name: String,
}

impl Default for FlagsConfig {
	fn default() -> Self {
		FlagsConfigLayer::default().finalize()
	}
}

/// Partial configuration as loaded from one source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagsConfigLayer {
	pub precedence: Option<OverridePrecedence>,
	pub settings_key_prefix: Option<String>,
	pub dump_key_prefix: Option<String>,
	pub teamfood_flag_name: Option<String>,
}

impl FlagsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.precedence.is_some() {
			self.precedence = other.precedence;
		}
		if other.settings_key_prefix.is_some() {
			self.settings_key_prefix = other.settings_key_prefix;
		}
		if other.dump_key_prefix.is_some() {
			self.dump_key_prefix = other.dump_key_prefix;
		}
		if other.teamfood_flag_name.is_some() {
			self.teamfood_flag_name = other.teamfood_flag_name;
		}
	}

	pub fn finalize(self) -> FlagsConfig {
		FlagsConfig {
			precedence: self.precedence.unwrap_or_default(),
			settings_key_prefix: self
				.settings_key_prefix
				.unwrap_or_else(|| DEFAULT_SETTINGS_KEY_PREFIX.to_string()),
			dump_key_prefix: self
				.dump_key_prefix
				.unwrap_or_else(|| DEFAULT_DUMP_KEY_PREFIX.to_string()),
			teamfood_flag_name: self
				.teamfood_flag_name
				.unwrap_or_else(|| TEAMFOOD_FLAG_NAME.to_string()),
		}
	}
}

/// Order in which layers are applied; later layers win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Something that contributes one [`FlagsConfigLayer`].
pub trait ConfigSource: Send + Sync {
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<FlagsConfigLayer, ConfigError>;
}

/// The built-in resolver settings.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<FlagsConfigLayer, ConfigError> {
		Ok(FlagsConfigLayer::default())
	}
}

/// Resolver settings from a TOML file. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlSource {
	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<FlagsConfigLayer, ConfigError> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "no sysflags config file");
				return Ok(FlagsConfigLayer::default());
			}
			Err(source) => {
				return Err(ConfigError::FileRead {
					path: self.path.clone(),
					source,
				});
			}
		};

		let layer: FlagsConfigLayer =
			toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
				path: self.path.clone(),
				source,
			})?;
		trace!(path = %self.path.display(), ?layer, "read sysflags config file");
		Ok(layer)
	}
}

/// `SYSFLAGS_*` environment variables. Empty values are treated as unset.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<FlagsConfigLayer, ConfigError> {
		let precedence = env_var("SYSFLAGS_PRECEDENCE")
			.map(|v| {
				v.parse().map_err(|message| ConfigError::InvalidValue {
					key: "SYSFLAGS_PRECEDENCE".to_string(),
					message,
				})
			})
			.transpose()?;
		Ok(FlagsConfigLayer {
			precedence,
			settings_key_prefix: env_var("SYSFLAGS_SETTINGS_KEY_PREFIX"),
			dump_key_prefix: env_var("SYSFLAGS_DUMP_KEY_PREFIX"),
			teamfood_flag_name: env_var("SYSFLAGS_TEAMFOOD_FLAG"),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Loads resolver settings from the defaults, an optional TOML file and the
/// environment.
pub fn load_config(config_path: Option<PathBuf>) -> Result<FlagsConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource), Box::new(EnvSource)];
	if let Some(path) = config_path {
		sources.push(Box::new(TomlSource::new(path)));
	}
	load_from_sources(sources)
}

pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<FlagsConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = FlagsConfigLayer::default();
	for source in sources {
		merged.merge(source.load()?);
	}

	let config = merged.finalize();
	debug!(precedence = ?config.precedence, teamfood = %config.teamfood_flag_name, "resolved sysflags config");
	Ok(config)
}
