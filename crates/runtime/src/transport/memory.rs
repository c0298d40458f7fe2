//! In-process transports.
//!
//! Frames still cross the boundary as owned JSON values, so anything that
//! works here also works over a pipe.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{QueueSender, TransportParts};

/// Two connected transports: `(controller, worker)`.
///
/// Frames sent by one side arrive on the other side's inbound queue. A side's
/// inbound queue closes once the other side's sender is dropped.
pub fn pair() -> (TransportParts, TransportParts) {
	let (to_worker_tx, to_worker_rx) = mpsc::unbounded_channel();
	let (to_controller_tx, to_controller_rx) = mpsc::unbounded_channel();

	let controller = TransportParts {
		sender: Arc::new(QueueSender::new(to_worker_tx)),
		inbound: to_controller_rx,
	};
	let worker = TransportParts {
		sender: Arc::new(QueueSender::new(to_controller_tx)),
		inbound: to_worker_rx,
	};

	(controller, worker)
}

/// A transport whose frames come back to the sending endpoint.
///
/// Lets handlers and callers share one endpoint. The inbound queue never
/// closes on its own because the endpoint holds its own sender.
pub fn loopback() -> TransportParts {
	let (tx, rx) = mpsc::unbounded_channel();
	TransportParts {
		sender: Arc::new(QueueSender::new(tx)),
		inbound: rx,
	}
}
