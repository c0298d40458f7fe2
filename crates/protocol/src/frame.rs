//! Transport frames.
//!
//! Every message on the wire is one JSON [`Frame`]. A request carries the
//! caller's payload plus a fresh [`CorrelationId`]; the reply travels back on
//! the same channel name with the same id and either a payload or a
//! [`ReplyError`]:
//!
//! ```text
//! {"kind":"request","channel":"GET_CARDANO_ADA_APP_CHANNEL","correlationId":"…","payload":{"path":"0001"}}
//! {"kind":"reply","channel":"GET_CARDANO_ADA_APP_CHANNEL","correlationId":"…","payload":{"major":2,…}}
//! {"kind":"reply","channel":"GET_CARDANO_ADA_APP_CHANNEL","correlationId":"…","error":{"kind":"HandlerFailed","message":"…"}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque token pairing a request with its reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
	/// Generates a fresh random (UUID v4) id.
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for CorrelationId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl fmt::Display for CorrelationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// One message on the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Frame {
	/// Outgoing call, dispatched to the handler registered for `channel`.
	Request(RequestFrame),
	/// Answer to an earlier request, matched by correlation id.
	Reply(ReplyFrame),
}

impl Frame {
	/// Channel name this frame travels on.
	pub fn channel(&self) -> &str {
		match self {
			Frame::Request(request) => &request.channel,
			Frame::Reply(reply) => &reply.channel,
		}
	}

	pub fn correlation_id(&self) -> &CorrelationId {
		match self {
			Frame::Request(request) => &request.correlation_id,
			Frame::Reply(reply) => &reply.correlation_id,
		}
	}
}

/// Request envelope: `{ correlationId, payload }` on a named channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFrame {
	pub channel: String,
	pub correlation_id: CorrelationId,
	pub payload: Value,
}

/// Reply envelope: `{ correlationId, payload }` or `{ correlationId, error }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyFrame {
	pub channel: String,
	pub correlation_id: CorrelationId,
	/// Success payload (mutually exclusive with `error`)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<Value>,
	/// Failure payload (mutually exclusive with `payload`)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ReplyError>,
}

impl ReplyFrame {
	/// Builds a reply for `request` from a handler outcome.
	pub fn answering(request: &RequestFrame, outcome: Result<Value, ReplyError>) -> Self {
		let (payload, error) = match outcome {
			Ok(payload) => (Some(payload), None),
			Err(error) => (None, Some(error)),
		};
		Self {
			channel: request.channel.clone(),
			correlation_id: request.correlation_id.clone(),
			payload,
			error,
		}
	}

	/// Splits the reply into its outcome. A missing payload reads as `null`.
	pub fn into_outcome(self) -> Result<Value, ReplyError> {
		match self.error {
			Some(error) => Err(error),
			None => Ok(self.payload.unwrap_or(Value::Null)),
		}
	}
}

/// Failure category carried by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
	/// The registered handler returned an error or panicked.
	HandlerFailed,
	/// Nothing is registered for the channel on the receiving side.
	NoHandler,
	/// The request payload did not match the handler's input type.
	InvalidPayload,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ErrorKind::HandlerFailed => "HandlerFailed",
			ErrorKind::NoHandler => "NoHandler",
			ErrorKind::InvalidPayload => "InvalidPayload",
		};
		f.write_str(name)
	}
}

/// Failure payload: `{ kind, message }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
	pub kind: ErrorKind,
	pub message: String,
}

impl ReplyError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}

	pub fn handler_failed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::HandlerFailed, message)
	}

	pub fn no_handler(channel: &str) -> Self {
		Self::new(ErrorKind::NoHandler, format!("no handler registered for '{channel}'"))
	}

	pub fn invalid_payload(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidPayload, message)
	}
}
