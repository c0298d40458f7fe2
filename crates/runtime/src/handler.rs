//! Type-erased handler storage.
//!
//! Typed handlers registered through [`Channel::on_request`] are wrapped into a
//! [`HandlerFn`] that takes and returns raw JSON, so the endpoint can keep one
//! table for every channel.
//!
//! [`Channel::on_request`]: crate::Channel::on_request

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hwipc_protocol::ReplyError;
use serde_json::Value;

/// Boxed future produced by an erased handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = std::result::Result<Value, ReplyError>> + Send>>;

/// Handler function: JSON payload -> async JSON reply.
pub type HandlerFn = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Result type returned by user handlers.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Failure raised by a user handler; travels to the caller as `HandlerFailed`.
///
/// Any [`std::error::Error`] converts into it, so handlers can use `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
	message: String,
}

impl HandlerError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

impl fmt::Display for HandlerError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl<E: std::error::Error> From<E> for HandlerError {
	fn from(err: E) -> Self {
		Self::new(err.to_string())
	}
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		format!("handler panicked: {message}")
	} else if let Some(message) = payload.downcast_ref::<String>() {
		format!("handler panicked: {message}")
	} else {
		"handler panicked".to_string()
	}
}
