//! Length-prefixed JSON over a byte stream.
//!
//! Each frame is `[u32 little-endian length][JSON bytes]`. Used for the stdio
//! pipes between the controller and worker processes.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::{QueueSender, TransportParts};
use crate::error::{Error, Result};

/// Largest frame accepted in either direction (64 MiB).
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Pipe transport over a writer (towards the peer) and a reader (from the peer).
pub struct PipeTransport<W, R> {
	writer: W,
	reader: R,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	pub fn new(writer: W, reader: R) -> Self {
		Self { writer, reader }
	}

	/// Starts the reader and writer tasks and returns the endpoint halves.
	///
	/// The inbound queue closes when the reader hits EOF or a framing error,
	/// and when the writer fails, so the endpoint's dispatch loop ends and its
	/// pending calls fail instead of waiting out their timeouts. A frame whose
	/// body is not JSON is skipped. Later sends fail with [`Error::Transport`]
	/// once the writer has stopped.
	pub fn spawn(self) -> TransportParts {
		let Self { mut writer, mut reader } = self;
		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Value>();
		let (inbound_tx, inbound) = mpsc::unbounded_channel();

		let reader_task = tokio::spawn(async move {
			loop {
				match read_frame(&mut reader).await {
					Ok(Some(message)) => {
						if inbound_tx.send(message).is_err() {
							break;
						}
					}
					Ok(None) => {
						tracing::debug!("Pipe closed by peer");
						break;
					}
					// Framing is intact after an undecodable body.
					Err(Error::Json(e)) => {
						tracing::warn!(error = %e, "Skipping frame with malformed body");
					}
					Err(e) => {
						tracing::error!(error = %e, "Pipe read failed");
						break;
					}
				}
			}
		});
		let reader_abort = reader_task.abort_handle();

		tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				let bytes = match encode_frame(&message) {
					Ok(bytes) => bytes,
					Err(e) => {
						tracing::warn!(error = %e, "Dropping unencodable outbound frame");
						continue;
					}
				};
				if let Err(e) = write_encoded(&mut writer, &bytes).await {
					tracing::error!(error = %e, "Pipe write failed, closing transport");
					reader_abort.abort();
					break;
				}
			}
			tracing::debug!("Pipe writer stopped");
		});

		TransportParts {
			sender: Arc::new(QueueSender::new(outbound_tx)),
			inbound,
		}
	}
}

/// Writes one frame and flushes.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
	let bytes = encode_frame(message)?;
	write_encoded(writer, &bytes).await
}

fn encode_frame(message: &Value) -> Result<Vec<u8>> {
	let bytes = serde_json::to_vec(message)?;
	if bytes.len() > MAX_FRAME_LEN {
		return Err(Error::Transport(format!(
			"Frame of {} bytes exceeds limit of {MAX_FRAME_LEN}",
			bytes.len()
		)));
	}
	Ok(bytes)
}

async fn write_encoded<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> Result<()> {
	let length = bytes.len() as u32;
	writer
		.write_all(&length.to_le_bytes())
		.await
		.map_err(|e| Error::Transport(format!("Failed to write length prefix: {e}")))?;
	writer
		.write_all(bytes)
		.await
		.map_err(|e| Error::Transport(format!("Failed to write frame body: {e}")))?;
	writer
		.flush()
		.await
		.map_err(|e| Error::Transport(format!("Failed to flush frame: {e}")))?;
	Ok(())
}

/// Reads one frame. Returns `Ok(None)` on EOF at a frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Value>> {
	let mut len_buf = [0u8; 4];
	let mut filled = 0;
	while filled < len_buf.len() {
		let n = reader
			.read(&mut len_buf[filled..])
			.await
			.map_err(|e| Error::Transport(format!("Failed to read length prefix: {e}")))?;
		if n == 0 {
			if filled == 0 {
				return Ok(None);
			}
			return Err(Error::Transport(format!(
				"Failed to read length prefix: stream ended after {filled} of 4 bytes"
			)));
		}
		filled += n;
	}

	let length = u32::from_le_bytes(len_buf) as usize;
	if length > MAX_FRAME_LEN {
		return Err(Error::Transport(format!(
			"Frame of {length} bytes exceeds limit of {MAX_FRAME_LEN}"
		)));
	}

	let mut body = vec![0u8; length];
	reader
		.read_exact(&mut body)
		.await
		.map_err(|e| Error::Transport(format!("Failed to read frame body: {e}")))?;

	Ok(Some(serde_json::from_slice(&body)?))
}
