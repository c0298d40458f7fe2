//! Error types for the hardware-wallet layer.

use thiserror::Error;

/// Result type alias for hardware-wallet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while wiring or driving the hardware-wallet channels.
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Runtime(#[from] hwipc_runtime::Error),

	#[error(transparent)]
	Device(#[from] DeviceError),
}

/// Failures reported by a [`DeviceBackend`](crate::DeviceBackend).
///
/// Handlers turn these into `HandlerFailed` replies carrying the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
	#[error("No device connected at '{0}'")]
	NotFound(String),

	#[error("Device at '{0}' is locked")]
	Locked(String),

	#[error("Cardano app is not open on device at '{0}'")]
	AppNotOpen(String),

	#[error("Invalid derivation path '{path}': {reason}")]
	InvalidPath { path: String, reason: String },

	#[error("Device at '{path}' is a {actual}, not a {expected}")]
	WrongDeviceType {
		path: String,
		expected: String,
		actual: String,
	},

	#[error("Device backend failure: {0}")]
	Backend(String),
}
