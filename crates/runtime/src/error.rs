//! Error types for the channel runtime.

use hwipc_protocol::{ErrorKind, ReplyError};
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while moving or correlating messages.
#[derive(Debug, Error)]
pub enum Error {
	/// Transport-level failure (peer gone, pipe broken, frame unencodable).
	#[error("Transport error: {0}")]
	Transport(String),

	/// No correlated reply arrived within the channel's bound.
	#[error("Timeout after {timeout_ms}ms waiting for reply on '{channel}'")]
	Timeout { channel: String, timeout_ms: u64 },

	/// The remote handler returned an error or panicked.
	#[error("Handler for '{channel}' failed: {message}")]
	HandlerFailed { channel: String, message: String },

	/// The receiving endpoint has nothing registered for the channel.
	#[error("No handler registered for '{channel}'")]
	NoHandler { channel: String },

	/// A payload did not match the type declared by the channel.
	#[error("Invalid payload on '{channel}': {message}")]
	InvalidPayload { channel: String, message: String },

	/// The endpoint's dispatch loop stopped while the call was pending.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// A handler is already registered for this channel name on the endpoint.
	#[error("Channel '{0}' already has a handler on this endpoint")]
	DuplicateChannel(String),

	/// `Endpoint::run` was called a second time.
	#[error("Endpoint dispatch loop is already running")]
	AlreadyRunning,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Converts a failure reply received on `channel` into an error.
	pub fn from_reply(channel: &str, error: ReplyError) -> Self {
		let channel = channel.to_string();
		match error.kind {
			ErrorKind::HandlerFailed => Error::HandlerFailed {
				channel,
				message: error.message,
			},
			ErrorKind::NoHandler => Error::NoHandler { channel },
			ErrorKind::InvalidPayload => Error::InvalidPayload {
				channel,
				message: error.message,
			},
		}
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}

	/// Returns true if the remote handler ran and failed.
	pub fn is_handler_failure(&self) -> bool {
		matches!(self, Error::HandlerFailed { .. })
	}

	/// Returns true for failures where retrying after reconnecting may help.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Error::Timeout { .. } | Error::Transport(_) | Error::ChannelClosed | Error::NoHandler { .. }
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reply_kinds_map_to_variants() {
		let err = Error::from_reply("c", ReplyError::handler_failed("boom"));
		assert!(err.is_handler_failure());
		assert_eq!(err.to_string(), "Handler for 'c' failed: boom");

		let err = Error::from_reply("c", ReplyError::no_handler("c"));
		assert!(matches!(err, Error::NoHandler { ref channel } if channel == "c"));

		let err = Error::from_reply("c", ReplyError::invalid_payload("missing field `path`"));
		assert!(matches!(err, Error::InvalidPayload { ref message, .. } if message.contains("path")));
	}

	#[test]
	fn retryable_classification() {
		let timeout = Error::Timeout {
			channel: "c".to_string(),
			timeout_ms: 500,
		};
		assert!(timeout.is_timeout());
		assert!(timeout.is_retryable());
		assert!(!Error::DuplicateChannel("c".to_string()).is_retryable());
	}
}
