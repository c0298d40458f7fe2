//! Pending-call table.
//!
//! Each outgoing call registers a one-shot reply slot keyed by its
//! [`CorrelationId`]. The lock is only held for insert/lookup/remove, never
//! across an await. Dropping a [`PendingReply`] before it resolves removes its
//! entry, so a late reply finds nothing and is dropped by the dispatch loop.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hwipc_protocol::CorrelationId;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

pub(crate) struct PendingCall {
	pub(crate) channel: Arc<str>,
	pub(crate) reply_tx: oneshot::Sender<Result<Value>>,
}

#[derive(Clone, Default)]
pub(crate) struct PendingCalls {
	calls: Arc<Mutex<HashMap<CorrelationId, PendingCall>>>,
}

impl PendingCalls {
	/// Registers a new call on `channel` under a fresh correlation id.
	pub(crate) fn register(&self, channel: Arc<str>) -> PendingReply {
		let id = CorrelationId::generate();
		let (reply_tx, rx) = oneshot::channel();
		self.calls.lock().insert(id.clone(), PendingCall { channel, reply_tx });

		PendingReply {
			rx,
			guard: CancelGuard {
				id,
				calls: self.clone(),
				completed: false,
			},
		}
	}

	/// Removes and returns the call for `id`, if it was made on `channel`.
	pub(crate) fn take(&self, channel: &str, id: &CorrelationId) -> Option<PendingCall> {
		let mut calls = self.calls.lock();
		let same_channel = calls.get(id).is_some_and(|call| &*call.channel == channel);
		if same_channel { calls.remove(id) } else { None }
	}

	/// Fails every outstanding call with [`Error::ChannelClosed`].
	pub(crate) fn fail_all(&self) -> usize {
		let drained: Vec<PendingCall> = self.calls.lock().drain().map(|(_, call)| call).collect();
		let count = drained.len();
		for call in drained {
			let _ = call.reply_tx.send(Err(Error::ChannelClosed));
		}
		count
	}

	pub(crate) fn len(&self) -> usize {
		self.calls.lock().len()
	}

	fn cancel(&self, id: &CorrelationId) -> bool {
		self.calls.lock().remove(id).is_some()
	}
}

/// RAII guard removing the pending entry when the caller gives up.
struct CancelGuard {
	id: CorrelationId,
	calls: PendingCalls,
	completed: bool,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.calls.cancel(&self.id) {
			tracing::debug!(correlation_id = %self.id, "Removed pending call abandoned by caller");
		}
	}
}

/// Future resolving with the correlated reply.
pub(crate) struct PendingReply {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl PendingReply {
	pub(crate) fn correlation_id(&self) -> &CorrelationId {
		&self.guard.id
	}
}

impl Future for PendingReply {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.completed = true;
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn take_resolves_matching_call() {
		let calls = PendingCalls::default();
		let reply = calls.register(Arc::from("c"));
		let id = reply.correlation_id().clone();
		assert_eq!(calls.len(), 1);

		let call = calls.take("c", &id).unwrap();
		call.reply_tx.send(Ok(serde_json::json!(7))).unwrap();

		assert_eq!(reply.await.unwrap(), 7);
		assert_eq!(calls.len(), 0);
	}

	#[test]
	fn take_ignores_other_channel() {
		let calls = PendingCalls::default();
		let reply = calls.register(Arc::from("c"));
		let id = reply.correlation_id().clone();

		assert!(calls.take("other", &id).is_none());
		assert_eq!(calls.len(), 1);
	}

	#[test]
	fn dropping_reply_cancels_entry() {
		let calls = PendingCalls::default();
		let reply = calls.register(Arc::from("c"));
		let id = reply.correlation_id().clone();

		drop(reply);
		assert_eq!(calls.len(), 0);
		assert!(calls.take("c", &id).is_none());
	}

	#[tokio::test]
	async fn fail_all_closes_outstanding_calls() {
		let calls = PendingCalls::default();
		let first = calls.register(Arc::from("a"));
		let second = calls.register(Arc::from("b"));

		assert_eq!(calls.fail_all(), 2);
		assert!(matches!(first.await, Err(Error::ChannelClosed)));
		assert!(matches!(second.await, Err(Error::ChannelClosed)));
	}
}
