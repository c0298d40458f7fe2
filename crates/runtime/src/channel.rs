//! Typed channels.
//!
//! A [`Channel`] is a name plus a request and reply type. It owns no transport
//! state: the endpoints are borrowed per call, so the same channel value can
//! be used from either side and direction can be chosen per invocation.
//!
//! ```ignore
//! let app: Channel<CardanoAppRequest, CardanoAppInfo> = Channel::new("GET_CARDANO_ADA_APP_CHANNEL");
//!
//! // controller side
//! app.on_request(|req| async move { open_app(&req.path).await }, &controller)?;
//!
//! // worker side
//! let info = app.request(CardanoAppRequest { path: "0001".into() }, &worker, &worker).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use hwipc_protocol::{Frame, ReplyError, RequestFrame};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::handler::{HandlerFn, HandlerFuture, HandlerResult};

/// Bound applied to calls on channels built with [`Channel::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A named, typed request/response conduit.
pub struct Channel<Req, Res> {
	name: Arc<str>,
	timeout: Duration,
	_types: PhantomData<fn(Req) -> Res>,
}

impl<Req, Res> Clone for Channel<Req, Res> {
	fn clone(&self) -> Self {
		Self {
			name: Arc::clone(&self.name),
			timeout: self.timeout,
			_types: PhantomData,
		}
	}
}

impl<Req, Res> fmt::Debug for Channel<Req, Res> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Channel")
			.field("name", &self.name)
			.field("timeout", &self.timeout)
			.finish()
	}
}

impl<Req, Res> Channel<Req, Res>
where
	Req: Serialize + DeserializeOwned + Send + 'static,
	Res: Serialize + DeserializeOwned + Send + 'static,
{
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			timeout: DEFAULT_TIMEOUT,
			_types: PhantomData,
		}
	}

	/// Replaces the per-call bound.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Sends `message` through `sender` and waits on `receiver` for the reply
	/// carrying the same correlation id.
	///
	/// Used for pushes whose handler only acknowledges. Dropping the returned
	/// future cancels the call; a reply arriving afterwards is dropped.
	pub async fn send(&self, message: Req, sender: &Endpoint, receiver: &Endpoint) -> Result<Res> {
		self.call(message, sender, receiver).await
	}

	/// Issues a request served by a handler registered with [`on_request`].
	///
	/// Same contract as [`send`](Self::send).
	///
	/// [`on_request`]: Self::on_request
	pub async fn request(&self, message: Req, sender: &Endpoint, receiver: &Endpoint) -> Result<Res> {
		self.call(message, sender, receiver).await
	}

	/// Registers `handler` for incoming messages on `receiver`.
	///
	/// The handler's result is sent back to the peer under the message's
	/// correlation id.
	pub fn on_receive<F, Fut>(&self, handler: F, receiver: &Endpoint) -> Result<()>
	where
		F: Fn(Req) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = HandlerResult<Res>> + Send + 'static,
	{
		self.register(handler, receiver)
	}

	/// Registers `handler` to serve requests on `receiver`.
	///
	/// Same mechanism as [`on_receive`](Self::on_receive). Fails with
	/// [`Error::DuplicateChannel`] if `receiver` already serves this name.
	pub fn on_request<F, Fut>(&self, handler: F, receiver: &Endpoint) -> Result<()>
	where
		F: Fn(Req) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = HandlerResult<Res>> + Send + 'static,
	{
		self.register(handler, receiver)
	}

	/// The bound in milliseconds, saturating at `u64::MAX`.
	fn timeout_ms(&self) -> u64 {
		u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
	}

	async fn call(&self, message: Req, sender: &Endpoint, receiver: &Endpoint) -> Result<Res> {
		let payload = serde_json::to_value(&message)
			.map_err(|e| Error::Transport(format!("Failed to serialize request for '{}': {e}", self.name)))?;

		// Register before posting so a fast reply always finds its slot.
		let reply = receiver.begin_call(&self.name);
		let correlation_id = reply.correlation_id().clone();

		tracing::debug!(
			channel = %self.name,
			correlation_id = %correlation_id,
			from = %sender.side(),
			"Sending request"
		);

		sender.post(&Frame::Request(RequestFrame {
			channel: self.name.to_string(),
			correlation_id: correlation_id.clone(),
			payload,
		}))?;

		let value = match tokio::time::timeout(self.timeout, reply).await {
			Ok(result) => result?,
			Err(_) => {
				tracing::warn!(
					channel = %self.name,
					correlation_id = %correlation_id,
					timeout_ms = self.timeout_ms(),
					"Request timed out"
				);
				return Err(Error::Timeout {
					channel: self.name.to_string(),
					timeout_ms: self.timeout_ms(),
				});
			}
		};

		serde_json::from_value(value).map_err(|e| Error::InvalidPayload {
			channel: self.name.to_string(),
			message: e.to_string(),
		})
	}

	fn register<F, Fut>(&self, handler: F, receiver: &Endpoint) -> Result<()>
	where
		F: Fn(Req) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = HandlerResult<Res>> + Send + 'static,
	{
		let handler = Arc::new(handler);
		let erased: HandlerFn = Arc::new(move |payload: Value| -> HandlerFuture {
			let message: Req = match serde_json::from_value(payload) {
				Ok(message) => message,
				Err(e) => return Box::pin(std::future::ready(Err(ReplyError::invalid_payload(e.to_string())))),
			};
			let fut = handler(message);
			Box::pin(async move {
				match fut.await {
					Ok(reply) => serde_json::to_value(reply)
						.map_err(|e| ReplyError::handler_failed(format!("Failed to serialize reply: {e}"))),
					Err(e) => Err(ReplyError::handler_failed(e.message())),
				}
			})
		});
		receiver.register(&self.name, erased)
	}
}
