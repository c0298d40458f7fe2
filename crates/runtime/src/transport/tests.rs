use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;
use crate::error::Error;
use crate::{Channel, Endpoint, Side};

#[test]
fn test_length_prefix_encoding() {
	let length: u32 = 1234;
	let bytes = length.to_le_bytes();

	assert_eq!(bytes[0], (length & 0xFF) as u8);
	assert_eq!(bytes[1], ((length >> 8) & 0xFF) as u8);
	assert_eq!(bytes[2], ((length >> 16) & 0xFF) as u8);
	assert_eq!(bytes[3], ((length >> 24) & 0xFF) as u8);
	assert_eq!(u32::from_le_bytes(bytes), length);
}

#[tokio::test]
async fn test_write_frame_format() {
	let message = serde_json::json!({"kind": "request", "channel": "c"});
	let mut buf = Vec::new();
	write_frame(&mut buf, &message).await.unwrap();

	let json_bytes = serde_json::to_vec(&message).unwrap();
	assert_eq!(buf.len(), 4 + json_bytes.len());
	assert_eq!(&buf[0..4], &(json_bytes.len() as u32).to_le_bytes());
	assert_eq!(&buf[4..], &json_bytes);
}

#[tokio::test]
async fn test_send_message() {
	let (peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, _peer_write) = tokio::io::duplex(1024);

	let parts = PipeTransport::new(transport_write, transport_read).spawn();

	let test_message = serde_json::json!({
		"kind": "request",
		"channel": "GET_CARDANO_ADA_APP_CHANNEL",
		"correlationId": "1",
		"payload": {"path": "0001"}
	});
	parts.sender.send(test_message.clone()).unwrap();

	let (mut read_half, _write_half) = tokio::io::split(peer_read);
	let mut len_buf = [0u8; 4];
	read_half.read_exact(&mut len_buf).await.unwrap();
	let length = u32::from_le_bytes(len_buf) as usize;

	let mut msg_buf = vec![0u8; length];
	read_half.read_exact(&mut msg_buf).await.unwrap();

	let received: serde_json::Value = serde_json::from_slice(&msg_buf).unwrap();
	assert_eq!(received, test_message);
}

#[tokio::test]
async fn test_multiple_messages_in_sequence() {
	let (_peer_read, transport_write) = tokio::io::duplex(4096);
	let (transport_read, mut peer_write) = tokio::io::duplex(4096);

	let mut parts = PipeTransport::new(transport_write, transport_read).spawn();

	let messages = vec![
		serde_json::json!({"correlationId": "1", "payload": "first"}),
		serde_json::json!({"correlationId": "2", "payload": "second"}),
		serde_json::json!({"correlationId": "3", "payload": "third"}),
	];

	for msg in &messages {
		write_frame(&mut peer_write, msg).await.unwrap();
	}

	for expected in &messages {
		let received = parts.inbound.recv().await.unwrap();
		assert_eq!(&received, expected);
	}

	drop(peer_write);
	assert!(parts.inbound.recv().await.is_none());
}

#[tokio::test]
async fn test_large_message() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024 * 1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024 * 1024);

	let mut parts = PipeTransport::new(transport_write, transport_read).spawn();

	let large_message = serde_json::json!({
		"correlationId": "1",
		"payload": "x".repeat(100_000)
	});
	write_frame(&mut peer_write, &large_message).await.unwrap();

	let received = parts.inbound.recv().await.unwrap();
	assert_eq!(received, large_message);
}

#[tokio::test]
async fn test_malformed_length_prefix() {
	let (mut peer_write, mut transport_read) = tokio::io::duplex(1024);

	peer_write.write_all(&[0x01, 0x02]).await.unwrap();
	peer_write.flush().await.unwrap();
	drop(peer_write);

	let result = read_frame(&mut transport_read).await;
	assert!(result.is_err());
	assert!(result.unwrap_err().to_string().contains("Failed to read length prefix"));
}

#[tokio::test]
async fn test_truncated_body() {
	let (mut peer_write, mut transport_read) = tokio::io::duplex(1024);

	peer_write.write_all(&100u32.to_le_bytes()).await.unwrap();
	peer_write.write_all(b"{\"a\":").await.unwrap();
	drop(peer_write);

	let err = read_frame(&mut transport_read).await.unwrap_err();
	assert!(err.to_string().contains("Failed to read frame body"));
}

#[tokio::test]
async fn test_oversized_length_is_rejected() {
	let (mut peer_write, mut transport_read) = tokio::io::duplex(1024);

	peer_write.write_all(&u32::MAX.to_le_bytes()).await.unwrap();

	let err = read_frame(&mut transport_read).await.unwrap_err();
	assert!(err.to_string().contains("exceeds limit"));
}

#[tokio::test]
async fn test_malformed_body_is_skipped() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024);

	let mut parts = PipeTransport::new(transport_write, transport_read).spawn();

	peer_write.write_all(&8u32.to_le_bytes()).await.unwrap();
	peer_write.write_all(b"not json").await.unwrap();
	let good = serde_json::json!({"correlationId": "2", "payload": "after"});
	write_frame(&mut peer_write, &good).await.unwrap();

	assert_eq!(parts.inbound.recv().await.unwrap(), good);
}

#[tokio::test]
async fn test_write_failure_fails_pending_calls() {
	let (peer_read, transport_write) = tokio::io::duplex(64);
	let (transport_read, _peer_write) = tokio::io::duplex(64);
	drop(peer_read);

	let worker = Endpoint::new(Side::Worker, PipeTransport::new(transport_write, transport_read).spawn());
	worker.spawn();
	let channel: Channel<u32, u32> = Channel::new("lost").with_timeout(Duration::from_secs(5));

	let started = Instant::now();
	let err = channel.request(1, &worker, &worker).await.unwrap_err();

	assert!(matches!(err, Error::ChannelClosed | Error::Transport(_)), "got {err:?}");
	assert!(started.elapsed() < Duration::from_secs(2));
	assert_eq!(worker.pending_count(), 0);
}

#[tokio::test]
async fn test_clean_eof_between_frames() {
	let (peer_write, mut transport_read) = tokio::io::duplex(1024);
	drop(peer_write);

	assert!(read_frame(&mut transport_read).await.unwrap().is_none());
}

#[tokio::test]
async fn test_broken_pipe_closes_inbound() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, peer_write) = tokio::io::duplex(1024);

	let mut parts = PipeTransport::new(transport_write, transport_read).spawn();
	drop(peer_write);

	assert!(parts.inbound.recv().await.is_none());
}

#[tokio::test]
async fn test_send_after_writer_stopped_fails() {
	let (peer_read, transport_write) = tokio::io::duplex(64);
	let (transport_read, _peer_write) = tokio::io::duplex(64);

	let parts = PipeTransport::new(transport_write, transport_read).spawn();
	drop(peer_read);

	parts.sender.send(serde_json::json!({"n": 1})).unwrap();

	let mut stopped = false;
	for _ in 0..50 {
		if !parts.sender.is_connected() {
			stopped = true;
			break;
		}
		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
	}
	assert!(stopped, "writer task should stop after the peer closed");
	assert!(parts.sender.send(serde_json::json!({"n": 2})).is_err());
}

#[tokio::test]
async fn test_memory_pair_delivers_both_ways() {
	let (mut controller, mut worker) = memory::pair();

	controller.sender.send(serde_json::json!("to worker")).unwrap();
	worker.sender.send(serde_json::json!("to controller")).unwrap();

	assert_eq!(worker.inbound.recv().await.unwrap(), "to worker");
	assert_eq!(controller.inbound.recv().await.unwrap(), "to controller");
}

#[tokio::test]
async fn test_memory_pair_closes_when_peer_sender_dropped() {
	let (controller, mut worker) = memory::pair();

	drop(controller.sender);
	assert!(worker.inbound.recv().await.is_none());

	drop(controller.inbound);
	assert!(!worker.sender.is_connected());
}

#[tokio::test]
async fn test_loopback_returns_to_sender() {
	let mut parts = memory::loopback();
	parts.sender.send(serde_json::json!({"echo": true})).unwrap();
	assert_eq!(parts.inbound.recv().await.unwrap()["echo"], true);
}
