// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod declarations;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sysflags::{
	CommandOutcome, EnvSystemProperties, FeatureFlags, FlagSnapshot, JsonFileSettingsStore,
	LoggingRestarter,
};
use sysflags_core::{FlagValue, FlagsError, OverrideCommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use declarations::Declarations;

/// Inspect and override feature flags
#[derive(Parser, Debug)]
#[command(name = "flagctl", version, about, long_about = None)]
struct Args {
	/// Flag declarations file
	#[arg(short, long, env = "SYSFLAGS_DECLARATIONS", default_value = "flags.toml")]
	declarations: PathBuf,

	/// Local override store (defaults to the user data directory)
	#[arg(short, long, env = "SYSFLAGS_STORE")]
	store: Option<PathBuf>,

	/// Path to configuration file
	#[arg(short, long, env = "SYSFLAGS_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the effective value of a flag
	Get { name: String },
	/// Set the local override of a flag
	Set { name: String, value: String },
	/// Clear the local override of a flag
	Clear { name: String },
	/// Print the diagnostic dump of every declared flag
	Dump,
	/// List declared flags with their overrides
	List,
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();

	let args = Args::parse();

	let config = sysflags::load_config(args.config.clone()).context("failed to load configuration")?;
	let decls = Declarations::load(&args.declarations)?;
	let store_path = match args.store {
		Some(path) => path,
		None => default_store_path()?,
	};
	debug!(store = %store_path.display(), flags = decls.registry.len(), "starting");

	let flags = FeatureFlags::builder(decls.registry)
		.settings(Arc::new(JsonFileSettingsStore::new(store_path)))
		.resources(Arc::new(decls.resources))
		.system_properties(Arc::new(EnvSystemProperties))
		.restarter(LoggingRestarter)
		.config(config)
		.build();

	match args.command {
		Command::Get { name } => {
			println!("{}", flags.value_of(&name)?);
		}
		Command::Set { name, value } => {
			let decl = flags
				.registry()
				.get(&name)
				.cloned()
				.ok_or_else(|| FlagsError::UnknownFlag(name.clone()))?;
			let value = FlagValue::parse_as(decl.kind(), &value)?;
			let outcome = flags.apply_command(&OverrideCommand::set(name.as_str(), value))?;
			println!("{}", describe(&name, outcome));
		}
		Command::Clear { name } => {
			let outcome = flags.apply_command(&OverrideCommand::clear(name.as_str()))?;
			println!("{}", describe(&name, outcome));
		}
		Command::Dump => {
			print!("{}", flags.dump_to_string()?);
		}
		Command::List => {
			for snapshot in flags.snapshot()? {
				println!("{}", list_line(&snapshot));
			}
		}
	}

	Ok(())
}

fn default_store_path() -> Result<PathBuf> {
	let data_dir = dirs::data_dir().context("no data directory for this platform, pass --store")?;
	Ok(data_dir.join("sysflags").join("overrides.json"))
}

fn describe(name: &str, outcome: CommandOutcome) -> String {
	match outcome {
		CommandOutcome::Written => format!("{name}: override written"),
		CommandOutcome::Cleared => format!("{name}: override cleared"),
		CommandOutcome::Unchanged => format!("{name}: override unchanged"),
		CommandOutcome::Ignored(reason) => format!("{name}: ignored ({reason:?})"),
	}
}

fn list_line(snapshot: &FlagSnapshot) -> String {
	let decl = &snapshot.declaration;
	let value = match &snapshot.value {
		Ok(value) => value.to_string(),
		Err(e) => format!("<error: {e}>"),
	};
	let layer = |value: &Option<FlagValue>| match value {
		Some(v) => v.to_string(),
		None => "-".to_string(),
	};
	format!(
		"{}\t{}.{}\t{}\t{}\tlocal={}\tserver={}",
		decl.id,
		decl.namespace,
		decl.name,
		decl.kind(),
		value,
		layer(&snapshot.local_override),
		layer(&snapshot.server_override),
	)
}
