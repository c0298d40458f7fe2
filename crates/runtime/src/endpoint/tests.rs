use std::sync::Arc;
use std::time::Duration;

use hwipc_protocol::{CorrelationId, ErrorKind};
use serde_json::json;

use super::*;
use crate::handler::HandlerFuture;
use crate::transport::memory;

fn echo_handler() -> HandlerFn {
	Arc::new(|payload: Value| -> HandlerFuture { Box::pin(async move { Ok(payload) }) })
}

async fn usb_failure(_: Value) -> std::result::Result<Value, ReplyError> {
	panic!("usb transfer failed")
}

fn reply_frame(channel: &str, id: &CorrelationId, payload: Value) -> Value {
	json!({
		"kind": "reply",
		"channel": channel,
		"correlationId": id.as_str(),
		"payload": payload,
	})
}

async fn wait_for_pending(endpoint: &Endpoint, expected: usize) {
	for _ in 0..100 {
		if endpoint.pending_count() == expected {
			return;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	panic!("expected {expected} pending calls, found {}", endpoint.pending_count());
}

#[test]
fn test_side_display() {
	assert_eq!(Side::Controller.to_string(), "controller");
	assert_eq!(Side::Worker.to_string(), "worker");
}

#[tokio::test]
async fn test_dispatch_reply_resolves_pending_call() {
	let endpoint = Endpoint::new(Side::Worker, memory::loopback());
	let channel: Arc<str> = Arc::from("GET_CARDANO_ADA_APP_CHANNEL");

	let reply = endpoint.begin_call(&channel);
	let id = reply.correlation_id().clone();
	assert_eq!(endpoint.pending_count(), 1);

	endpoint.dispatch(reply_frame(&channel, &id, json!({"major": 2})));

	let value = reply.await.unwrap();
	assert_eq!(value["major"], 2);
	assert_eq!(endpoint.pending_count(), 0);
	assert_eq!(endpoint.dropped_reply_count(), 0);
}

#[tokio::test]
async fn test_dispatch_error_reply() {
	let endpoint = Endpoint::new(Side::Worker, memory::loopback());
	let channel: Arc<str> = Arc::from("c");

	let reply = endpoint.begin_call(&channel);
	let id = reply.correlation_id().clone();

	endpoint.dispatch(json!({
		"kind": "reply",
		"channel": "c",
		"correlationId": id.as_str(),
		"error": {"kind": "HandlerFailed", "message": "device locked"},
	}));

	match reply.await {
		Err(Error::HandlerFailed { channel, message }) => {
			assert_eq!(channel, "c");
			assert_eq!(message, "device locked");
		}
		other => panic!("expected HandlerFailed, got {other:?}"),
	}
}

#[tokio::test]
async fn test_unknown_correlation_id_is_dropped() {
	let endpoint = Endpoint::new(Side::Worker, memory::loopback());
	let channel: Arc<str> = Arc::from("c");
	let _reply = endpoint.begin_call(&channel);

	endpoint.dispatch(reply_frame("c", &CorrelationId::from("not-a-call"), json!(1)));

	assert_eq!(endpoint.dropped_reply_count(), 1);
	assert_eq!(endpoint.pending_count(), 1);
}

#[tokio::test]
async fn test_reply_on_wrong_channel_is_dropped() {
	let endpoint = Endpoint::new(Side::Worker, memory::loopback());
	let reply = endpoint.begin_call(&Arc::from("a"));
	let id = reply.correlation_id().clone();

	endpoint.dispatch(reply_frame("b", &id, json!(1)));

	assert_eq!(endpoint.dropped_reply_count(), 1);
	assert_eq!(endpoint.pending_count(), 1);
}

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
	let endpoint = Endpoint::new(Side::Controller, memory::loopback());

	endpoint.dispatch(json!({"kind": "gossip"}));
	endpoint.dispatch(json!("not an object"));

	assert_eq!(endpoint.dropped_reply_count(), 0);
	assert_eq!(endpoint.pending_count(), 0);
}

#[test]
fn test_duplicate_registration_rejected() {
	let endpoint = Endpoint::new(Side::Controller, memory::loopback());

	endpoint.register("c", echo_handler()).unwrap();
	let err = endpoint.register("c", echo_handler()).unwrap_err();

	assert!(matches!(err, Error::DuplicateChannel(ref name) if name == "c"));
	assert!(endpoint.has_handler("c"));
	assert!(!endpoint.has_handler("d"));
}

#[test]
fn test_channel_names_sorted() {
	let endpoint = Endpoint::new(Side::Controller, memory::loopback());
	endpoint.register("b", echo_handler()).unwrap();
	endpoint.register("a", echo_handler()).unwrap();

	assert_eq!(endpoint.channel_names(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_request_without_handler_gets_no_handler_reply() {
	let (controller_parts, mut worker_parts) = memory::pair();
	let controller = Endpoint::new(Side::Controller, controller_parts);

	controller.dispatch(json!({
		"kind": "request",
		"channel": "MISSING",
		"correlationId": "abc",
		"payload": null,
	}));

	let reply = worker_parts.inbound.recv().await.unwrap();
	assert_eq!(reply["kind"], "reply");
	assert_eq!(reply["correlationId"], "abc");
	assert_eq!(reply["error"]["kind"], "NoHandler");
}

#[tokio::test]
async fn test_request_runs_handler_and_replies() {
	let (controller_parts, mut worker_parts) = memory::pair();
	let controller = Endpoint::new(Side::Controller, controller_parts);
	controller.register("echo", echo_handler()).unwrap();

	controller.dispatch(json!({
		"kind": "request",
		"channel": "echo",
		"correlationId": "abc",
		"payload": {"path": "0001"},
	}));

	let reply = worker_parts.inbound.recv().await.unwrap();
	assert_eq!(reply["channel"], "echo");
	assert_eq!(reply["correlationId"], "abc");
	assert_eq!(reply["payload"]["path"], "0001");
	assert!(reply.get("error").is_none());
}

#[tokio::test]
async fn test_panicking_handler_replies_with_failure() {
	let (controller_parts, mut worker_parts) = memory::pair();
	let controller = Endpoint::new(Side::Controller, controller_parts);
	let handler: HandlerFn = Arc::new(|payload: Value| -> HandlerFuture { Box::pin(usb_failure(payload)) });
	controller.register("boom", handler).unwrap();

	controller.dispatch(json!({
		"kind": "request",
		"channel": "boom",
		"correlationId": "abc",
		"payload": null,
	}));

	let reply: ReplyFrame = serde_json::from_value(worker_parts.inbound.recv().await.unwrap()).unwrap();
	let error = reply.error.unwrap();
	assert_eq!(error.kind, ErrorKind::HandlerFailed);
	assert!(error.message.contains("usb transfer failed"));
}

#[tokio::test]
async fn test_run_twice_is_rejected() {
	let endpoint = Endpoint::new(Side::Worker, memory::loopback());
	let _task = endpoint.spawn();
	tokio::task::yield_now().await;

	for _ in 0..100 {
		if endpoint.inner.inbound.lock().is_none() {
			break;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	assert!(matches!(endpoint.run().await, Err(Error::AlreadyRunning)));
}

#[tokio::test]
async fn test_loop_end_fails_pending_calls() {
	let (controller_parts, worker_parts) = memory::pair();
	let worker = Endpoint::new(Side::Worker, worker_parts);
	let loop_task = worker.spawn();

	let caller = worker.clone();
	let call = tokio::spawn(async move {
		let channel: Arc<str> = Arc::from("c");
		caller.begin_call(&channel).await
	});
	wait_for_pending(&worker, 1).await;

	drop(controller_parts);

	assert!(matches!(call.await.unwrap(), Err(Error::ChannelClosed)));
	loop_task.await.unwrap().unwrap();
	assert_eq!(worker.pending_count(), 0);
}

#[tokio::test]
async fn test_post_after_peer_gone_fails() {
	let (controller_parts, worker_parts) = memory::pair();
	let worker = Endpoint::new(Side::Worker, worker_parts);
	drop(controller_parts);

	assert!(!worker.is_connected());
	let frame = Frame::Request(RequestFrame {
		channel: "c".to_string(),
		correlation_id: CorrelationId::generate(),
		payload: Value::Null,
	});
	assert!(matches!(worker.post(&frame), Err(Error::Transport(_))));
}
