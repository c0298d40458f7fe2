//! `hwipc config show|init`.

use std::path::Path;

use serde_json::json;

use crate::config::{HwipcConfig, LoadedConfig, save_config};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, print_json};

pub fn show(loaded: &LoadedConfig, format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Json => print_json(&json!({
			"path": loaded.path,
			"fromFile": loaded.from_file,
			"config": loaded.config,
		})),
		OutputFormat::Text => {
			let source = if loaded.from_file { "" } else { " (not found, defaults)" };
			println!("# {}{source}", loaded.path.display());
			println!("{}", serde_json::to_string_pretty(&loaded.config)?);
			Ok(())
		}
	}
}

/// Writes the default config to `path`.
pub fn init(path: &Path, force: bool) -> Result<()> {
	if path.exists() && !force {
		return Err(CliError::ConfigExists(path.to_path_buf()));
	}
	save_config(path, &HwipcConfig::default())?;
	tracing::info!(path = %path.display(), "Wrote default config");
	println!("{}", path.display());
	Ok(())
}
