//! CLI configuration file.
//!
//! JSON, camelCase keys. Looked up at `--config` when given, otherwise at
//! `$XDG_CONFIG_HOME/hwipc/config.json` (`~/.config/hwipc/config.json`).
//! A missing file at the default location means defaults; an explicit path
//! must exist and parse.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hwipc::{DetectorConfig, DeviceDescriptor};
use hwipc_protocol::DeviceType;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HwipcConfig {
	/// Bound on every channel call.
	pub request_timeout_ms: u64,
	pub poll_interval_ms: u64,
	pub max_consecutive_failures: u32,
	/// Simulated devices, `type:model:path[:name]`.
	pub devices: Vec<String>,
}

impl Default for HwipcConfig {
	fn default() -> Self {
		let detector = DetectorConfig::default();
		Self {
			request_timeout_ms: hwipc_runtime::DEFAULT_TIMEOUT.as_millis() as u64,
			poll_interval_ms: detector.poll_interval.as_millis() as u64,
			max_consecutive_failures: detector.max_consecutive_failures,
			devices: Vec::new(),
		}
	}
}

impl HwipcConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	pub fn detector(&self) -> DetectorConfig {
		DetectorConfig {
			poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
			max_consecutive_failures: self.max_consecutive_failures.max(1),
		}
	}

	/// Parses every configured device spec.
	pub fn device_descriptors(&self) -> Result<Vec<DeviceDescriptor>> {
		self.devices.iter().map(|spec| parse_device_spec(spec)).collect()
	}
}

/// Config plus the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
	pub config: HwipcConfig,
	pub path: PathBuf,
	/// False when defaults were used because the file does not exist.
	pub from_file: bool,
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
		.unwrap_or_else(|| PathBuf::from("."));
	config_home.join("hwipc/config.json")
}

pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
	let path = explicit.map(Path::to_path_buf).unwrap_or_else(default_config_path);

	if explicit.is_none() && !path.exists() {
		tracing::debug!(path = %path.display(), "No config file, using defaults");
		return Ok(LoadedConfig {
			config: HwipcConfig::default(),
			path,
			from_file: false,
		});
	}

	let content = fs::read_to_string(&path).map_err(|e| CliError::Config {
		path: path.clone(),
		message: e.to_string(),
	})?;
	let config = serde_json::from_str(&content).map_err(|e| CliError::Config {
		path: path.clone(),
		message: e.to_string(),
	})?;
	tracing::debug!(path = %path.display(), "Loaded config");

	Ok(LoadedConfig {
		config,
		path,
		from_file: true,
	})
}

pub fn save_config(path: &Path, config: &HwipcConfig) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::write(path, serde_json::to_string_pretty(config)?)?;
	Ok(())
}

/// Parses `type:model:path[:name]`, e.g. `ledger:nanoS:0001`. The name
/// defaults to the model.
pub fn parse_device_spec(spec: &str) -> Result<DeviceDescriptor> {
	let invalid = |reason: &str| CliError::DeviceSpec {
		spec: spec.to_string(),
		reason: reason.to_string(),
	};

	let mut parts = spec.splitn(4, ':');
	let (Some(kind), Some(model), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
		return Err(invalid("expected type:model:path[:name]"));
	};
	if model.is_empty() || path.is_empty() {
		return Err(invalid("model and path must not be empty"));
	}
	let device_type: DeviceType = kind.parse().map_err(|e: String| invalid(&e))?;
	let name = parts.next().filter(|n| !n.is_empty()).unwrap_or(model);

	Ok(DeviceDescriptor::new(device_type, path, model, name))
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn defaults_match_library_defaults() {
		let config = HwipcConfig::default();
		assert_eq!(config.request_timeout(), hwipc_runtime::DEFAULT_TIMEOUT);
		assert_eq!(config.detector(), DetectorConfig::default());
		assert!(config.devices.is_empty());
	}

	#[test]
	fn partial_file_fills_defaults() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("config.json");
		fs::write(&path, r#"{"requestTimeoutMs": 1500, "devices": ["ledger:nanoS:0001"]}"#).unwrap();

		let loaded = load_config(Some(&path)).unwrap();
		assert!(loaded.from_file);
		assert_eq!(loaded.config.request_timeout_ms, 1500);
		assert_eq!(loaded.config.poll_interval_ms, HwipcConfig::default().poll_interval_ms);
		assert_eq!(loaded.config.device_descriptors().unwrap().len(), 1);
	}

	#[test]
	fn explicit_missing_file_is_an_error() {
		let tmp = TempDir::new().unwrap();
		let err = load_config(Some(&tmp.path().join("nope.json"))).unwrap_err();
		assert!(matches!(err, CliError::Config { .. }));
	}

	#[test]
	fn malformed_file_is_an_error() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("config.json");
		fs::write(&path, "{ not json").unwrap();
		assert!(matches!(load_config(Some(&path)), Err(CliError::Config { .. })));
	}

	#[test]
	fn save_then_load() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("nested/dir/config.json");
		let config = HwipcConfig {
			poll_interval_ms: 250,
			devices: vec!["trezor:T:0002:Office".to_string()],
			..Default::default()
		};

		save_config(&path, &config).unwrap();
		assert_eq!(load_config(Some(&path)).unwrap().config, config);
	}

	#[test]
	fn zero_intervals_are_clamped() {
		let config = HwipcConfig {
			poll_interval_ms: 0,
			max_consecutive_failures: 0,
			..Default::default()
		};
		let detector = config.detector();
		assert_eq!(detector.poll_interval, Duration::from_millis(1));
		assert_eq!(detector.max_consecutive_failures, 1);
	}

	#[test]
	fn device_specs() {
		let device = parse_device_spec("ledger:nanoS:0001").unwrap();
		assert_eq!(device.device_type, DeviceType::Ledger);
		assert_eq!(device.model, "nanoS");
		assert_eq!(device.path, "0001");
		assert_eq!(device.name, "nanoS");

		let device = parse_device_spec("Trezor:T:usb:1:Office").unwrap_or_else(|e| panic!("{e}"));
		assert_eq!(device.device_type, DeviceType::Trezor);
		assert_eq!(device.path, "usb");
		assert_eq!(device.name, "1:Office");

		assert!(parse_device_spec("ledger:nanoS").is_err());
		assert!(parse_device_spec("keepkey:x:0001").is_err());
		assert!(parse_device_spec("ledger::0001").is_err());
	}
}
