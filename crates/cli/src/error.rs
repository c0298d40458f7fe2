use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid config file {path}: {message}")]
	Config { path: PathBuf, message: String },

	#[error("config file {0} already exists (use --force to overwrite)")]
	ConfigExists(PathBuf),

	#[error("invalid device spec '{spec}': {reason}")]
	DeviceSpec { spec: String, reason: String },

	#[error("no connected device reported within {ms}ms")]
	NoDevice { ms: u64 },

	#[error("controller process exited before answering")]
	ControllerGone,

	#[error(transparent)]
	Runtime(#[from] hwipc_runtime::Error),

	#[error(transparent)]
	HardwareWallet(#[from] hwipc::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Process exit code for this failure.
	pub fn exit_code(&self) -> i32 {
		match self {
			CliError::Config { .. } | CliError::ConfigExists(_) | CliError::DeviceSpec { .. } => 2,
			_ => 1,
		}
	}
}
