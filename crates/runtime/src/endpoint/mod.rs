//! Endpoint: one side of the transport.
//!
//! An endpoint owns the two process-local tables of the channel layer:
//!
//! - the **handler table**, channel name -> handler, consulted for every
//!   incoming request
//! - the **pending table**, correlation id -> reply slot, consulted for every
//!   incoming reply
//!
//! # Message Flow
//!
//! 1. A caller registers a pending slot on its receiving endpoint
//! 2. The request frame is posted through the sending endpoint's transport
//! 3. The peer's dispatch loop looks up the handler by channel name and runs
//!    it on its own task
//! 4. The handler's result is posted back with the same correlation id
//! 5. The caller's dispatch loop resolves and removes the matching slot
//!
//! Replies without a matching slot (stale, cancelled, timed out, duplicated)
//! are logged and dropped; they never reach a caller.

mod pending;
#[cfg(test)]
mod tests;

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use hwipc_protocol::{Frame, ReplyError, ReplyFrame, RequestFrame};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) use self::pending::PendingReply;
use self::pending::PendingCalls;
use crate::error::{Error, Result};
use crate::handler::{HandlerFn, panic_message};
use crate::transport::{Transport, TransportParts};

/// Which process an endpoint lives in. Used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
	/// The long-lived process talking to devices.
	Controller,
	/// A process issuing requests and listening for broadcasts.
	Worker,
}

impl fmt::Display for Side {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Side::Controller => f.write_str("controller"),
			Side::Worker => f.write_str("worker"),
		}
	}
}

/// Cheap, cloneable handle to one side of the transport.
#[derive(Clone)]
pub struct Endpoint {
	inner: Arc<EndpointInner>,
}

struct EndpointInner {
	side: Side,
	sender: Arc<dyn Transport>,
	/// Taken by `run()`
	inbound: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
	handlers: DashMap<Arc<str>, HandlerFn>,
	pending: PendingCalls,
	dropped_replies: AtomicU64,
}

impl fmt::Debug for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Endpoint")
			.field("side", &self.inner.side)
			.field("handlers", &self.inner.handlers.len())
			.field("pending", &self.inner.pending.len())
			.finish()
	}
}

impl Endpoint {
	pub fn new(side: Side, parts: TransportParts) -> Self {
		let TransportParts { sender, inbound } = parts;
		Self {
			inner: Arc::new(EndpointInner {
				side,
				sender,
				inbound: Mutex::new(Some(inbound)),
				handlers: DashMap::new(),
				pending: PendingCalls::default(),
				dropped_replies: AtomicU64::new(0),
			}),
		}
	}

	pub fn side(&self) -> Side {
		self.inner.side
	}

	/// Whether the transport towards the peer is still open.
	pub fn is_connected(&self) -> bool {
		self.inner.sender.is_connected()
	}

	/// Registers `handler` for `channel`.
	///
	/// A channel name is the only demultiplexing key on the wire, so a second
	/// registration for the same name is rejected instead of replacing the first.
	pub(crate) fn register(&self, channel: &str, handler: HandlerFn) -> Result<()> {
		match self.inner.handlers.entry(Arc::from(channel)) {
			Entry::Occupied(_) => {
				tracing::warn!(side = %self.inner.side, channel, "Duplicate channel registration rejected");
				Err(Error::DuplicateChannel(channel.to_string()))
			}
			Entry::Vacant(slot) => {
				slot.insert(handler);
				tracing::debug!(side = %self.inner.side, channel, "Handler registered");
				Ok(())
			}
		}
	}

	pub fn has_handler(&self, channel: &str) -> bool {
		self.inner.handlers.contains_key(channel)
	}

	/// Names of all channels served by this endpoint, sorted.
	pub fn channel_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.inner.handlers.iter().map(|entry| entry.key().to_string()).collect();
		names.sort();
		names
	}

	/// Number of calls waiting for a reply on this endpoint.
	pub fn pending_count(&self) -> usize {
		self.inner.pending.len()
	}

	/// Number of replies dropped because no call was waiting for them.
	pub fn dropped_reply_count(&self) -> u64 {
		self.inner.dropped_replies.load(Ordering::Relaxed)
	}

	/// Posts a frame to the peer.
	pub fn post(&self, frame: &Frame) -> Result<()> {
		let value = serde_json::to_value(frame)
			.map_err(|e| Error::Transport(format!("Failed to encode frame for '{}': {e}", frame.channel())))?;
		self.inner.sender.send(value)
	}

	/// Opens a reply slot for a call on `channel`.
	pub(crate) fn begin_call(&self, channel: &Arc<str>) -> PendingReply {
		self.inner.pending.register(Arc::clone(channel))
	}

	/// Runs the dispatch loop until the transport closes.
	///
	/// On exit every call still waiting on this endpoint fails with
	/// [`Error::ChannelClosed`].
	pub async fn run(&self) -> Result<()> {
		let mut inbound = self.inner.inbound.lock().take().ok_or(Error::AlreadyRunning)?;

		tracing::debug!(side = %self.inner.side, "Dispatch loop started");

		while let Some(value) = inbound.recv().await {
			self.dispatch(value);
		}

		let failed = self.inner.pending.fail_all();
		tracing::debug!(side = %self.inner.side, failed, "Dispatch loop stopped");
		Ok(())
	}

	/// Runs the dispatch loop on a new task.
	pub fn spawn(&self) -> JoinHandle<Result<()>> {
		let endpoint = self.clone();
		tokio::spawn(async move { endpoint.run().await })
	}

	pub(crate) fn dispatch(&self, value: Value) {
		match serde_json::from_value::<Frame>(value) {
			Ok(Frame::Request(request)) => self.handle_request(request),
			Ok(Frame::Reply(reply)) => self.handle_reply(reply),
			Err(e) => {
				tracing::warn!(side = %self.inner.side, error = %e, "Dropping malformed frame");
			}
		}
	}

	fn handle_request(&self, mut request: RequestFrame) {
		let handler = self
			.inner
			.handlers
			.get(request.channel.as_str())
			.map(|entry| Arc::clone(entry.value()));

		let Some(handler) = handler else {
			tracing::warn!(
				side = %self.inner.side,
				channel = %request.channel,
				correlation_id = %request.correlation_id,
				"No handler registered, rejecting request"
			);
			let reply = ReplyFrame::answering(&request, Err(ReplyError::no_handler(&request.channel)));
			if let Err(e) = self.post(&Frame::Reply(reply)) {
				tracing::warn!(side = %self.inner.side, error = %e, "Failed to send rejection");
			}
			return;
		};

		tracing::debug!(
			side = %self.inner.side,
			channel = %request.channel,
			correlation_id = %request.correlation_id,
			"Dispatching request"
		);

		let endpoint = self.clone();
		tokio::spawn(async move {
			let payload = std::mem::take(&mut request.payload);
			let outcome = match AssertUnwindSafe(async move { handler(payload).await })
				.catch_unwind()
				.await
			{
				Ok(outcome) => outcome,
				Err(panic) => Err(ReplyError::handler_failed(panic_message(panic.as_ref()))),
			};

			if let Err(error) = &outcome {
				tracing::debug!(
					channel = %request.channel,
					correlation_id = %request.correlation_id,
					kind = %error.kind,
					message = %error.message,
					"Handler failed"
				);
			}

			let reply = ReplyFrame::answering(&request, outcome);
			if let Err(e) = endpoint.post(&Frame::Reply(reply)) {
				tracing::warn!(
					side = %endpoint.inner.side,
					channel = %request.channel,
					error = %e,
					"Failed to send reply"
				);
			}
		});
	}

	fn handle_reply(&self, reply: ReplyFrame) {
		let Some(call) = self.inner.pending.take(&reply.channel, &reply.correlation_id) else {
			self.inner.dropped_replies.fetch_add(1, Ordering::Relaxed);
			tracing::debug!(
				side = %self.inner.side,
				channel = %reply.channel,
				correlation_id = %reply.correlation_id,
				"Dropping reply with no pending call"
			);
			return;
		};

		let result = reply
			.into_outcome()
			.map_err(|error| Error::from_reply(&call.channel, error));
		let _ = call.reply_tx.send(result);
	}
}
