//! Transports: fire-and-forget delivery of JSON frames between two endpoints.
//!
//! A transport is split into [`TransportParts`]: a [`Transport`] sender used to
//! post frames to the peer, and an inbound queue the endpoint's dispatch loop
//! drains. Transports never correlate, retry or deduplicate; that is the
//! endpoint's job.

pub mod memory;
mod pipe;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

pub use pipe::{MAX_FRAME_LEN, PipeTransport, read_frame, write_frame};

/// Outbound half of a transport.
pub trait Transport: Send + Sync {
	/// Hands one frame to the transport for delivery to the peer.
	///
	/// Returns as soon as the frame is queued; delivery is not acknowledged.
	fn send(&self, message: Value) -> Result<()>;

	/// Whether the peer side can still receive frames.
	fn is_connected(&self) -> bool {
		true
	}
}

/// The two halves an [`Endpoint`](crate::Endpoint) is built from.
pub struct TransportParts {
	pub sender: Arc<dyn Transport>,
	pub inbound: mpsc::UnboundedReceiver<Value>,
}

/// [`Transport`] backed by an unbounded queue.
///
/// Used directly by the in-memory transports and as the front of the pipe
/// transport's writer task.
#[derive(Clone)]
pub struct QueueSender {
	tx: mpsc::UnboundedSender<Value>,
}

impl QueueSender {
	pub fn new(tx: mpsc::UnboundedSender<Value>) -> Self {
		Self { tx }
	}
}

impl Transport for QueueSender {
	fn send(&self, message: Value) -> Result<()> {
		self.tx
			.send(message)
			.map_err(|_| Error::Transport("peer endpoint is gone".to_string()))
	}

	fn is_connected(&self) -> bool {
		!self.tx.is_closed()
	}
}
