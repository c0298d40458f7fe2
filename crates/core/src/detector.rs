//! Connection detector.
//!
//! Polls the device backend and pushes a [`DeviceConnectionSnapshot`] on the
//! connection channel for every attach and detach. Nothing is pushed while the
//! device set is stable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use hwipc_protocol::{Ack, DeviceConnectionSnapshot};
use hwipc_runtime::{Channel, Endpoint};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::device::{DeviceBackend, DeviceDescriptor};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
	pub poll_interval: Duration,
	/// Consecutive `list_devices` failures after which the loop gives up.
	pub max_consecutive_failures: u32,
}

impl Default for DetectorConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_millis(1000),
			max_consecutive_failures: 5,
		}
	}
}

/// Why a detector loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorExit {
	Shutdown,
	BackendFailed { failures: u32, last_error: String },
}

pub struct ConnectionDetector {
	backend: Arc<dyn DeviceBackend>,
	channel: Channel<DeviceConnectionSnapshot, Ack>,
	endpoint: Endpoint,
	config: DetectorConfig,
}

impl ConnectionDetector {
	/// `endpoint` is the controller endpoint; snapshots go to its peer.
	///
	/// A zero poll interval is raised to 1ms and a zero failure limit to 1.
	pub fn new(
		backend: Arc<dyn DeviceBackend>,
		channel: Channel<DeviceConnectionSnapshot, Ack>,
		endpoint: Endpoint,
		config: DetectorConfig,
	) -> Self {
		let config = DetectorConfig {
			poll_interval: config.poll_interval.max(MIN_POLL_INTERVAL),
			max_consecutive_failures: config.max_consecutive_failures.max(1),
		};
		Self {
			backend,
			channel,
			endpoint,
			config,
		}
	}

	/// Starts polling on a new task.
	pub fn start(self) -> DetectorHandle {
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let task = tokio::spawn(self.run(shutdown_rx));
		DetectorHandle {
			shutdown: shutdown_tx,
			task,
		}
	}

	async fn run(self, mut shutdown: watch::Receiver<bool>) -> DetectorExit {
		let mut known: BTreeMap<String, DeviceDescriptor> = BTreeMap::new();
		let mut failures = 0u32;
		let mut interval = tokio::time::interval(self.config.poll_interval);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

		tracing::info!(
			poll_interval_ms = u64::try_from(self.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
			"Connection detector started"
		);

		loop {
			tokio::select! {
				changed = shutdown.changed() => {
					if changed.is_err() || *shutdown.borrow() {
						tracing::info!("Connection detector stopped");
						return DetectorExit::Shutdown;
					}
				}
				_ = interval.tick() => {
					match self.backend.list_devices().await {
						Ok(current) => {
							failures = 0;
							for snapshot in diff_devices(&mut known, current) {
								// An unacknowledged push must not hold up shutdown.
								tokio::select! {
									() = self.push(snapshot) => {}
									_ = shutdown.changed() => {
										tracing::info!("Connection detector stopped");
										return DetectorExit::Shutdown;
									}
								}
							}
						}
						Err(e) => {
							failures += 1;
							tracing::warn!(error = %e, failures, "Device enumeration failed");
							if failures >= self.config.max_consecutive_failures {
								tracing::error!(failures, "Connection detector giving up");
								return DetectorExit::BackendFailed {
									failures,
									last_error: e.to_string(),
								};
							}
						}
					}
				}
			}
		}
	}

	async fn push(&self, snapshot: DeviceConnectionSnapshot) {
		tracing::info!(
			path = %snapshot.path,
			device_type = %snapshot.device_type,
			disconnected = snapshot.disconnected,
			"Device connection changed"
		);
		if let Err(e) = self.channel.send(snapshot, &self.endpoint, &self.endpoint).await {
			tracing::warn!(error = %e, "Failed to push connection snapshot");
		}
	}
}

/// Updates `known` to `current` and returns one snapshot per change:
/// detaches first, then attaches, each in path order.
///
/// A device whose descriptor changed at the same path counts as a detach
/// followed by an attach.
pub fn diff_devices(
	known: &mut BTreeMap<String, DeviceDescriptor>,
	current: Vec<DeviceDescriptor>,
) -> Vec<DeviceConnectionSnapshot> {
	let current: BTreeMap<String, DeviceDescriptor> = current.into_iter().map(|d| (d.path.clone(), d)).collect();

	let detached = known
		.iter()
		.filter(|(path, device)| current.get(*path) != Some(*device))
		.map(|(_, device)| device.snapshot(true));
	let attached = current
		.iter()
		.filter(|(path, device)| known.get(*path) != Some(*device))
		.map(|(_, device)| device.snapshot(false));
	let changes = detached.chain(attached).collect();

	*known = current;
	changes
}

/// Controls a running detector.
pub struct DetectorHandle {
	shutdown: watch::Sender<bool>,
	task: JoinHandle<DetectorExit>,
}

impl DetectorHandle {
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Signals the loop to stop and waits for it.
	pub async fn stop(self) -> DetectorExit {
		let _ = self.shutdown.send(true);
		match self.task.await {
			Ok(exit) => exit,
			Err(e) => DetectorExit::BackendFailed {
				failures: 0,
				last_error: format!("detector task failed: {e}"),
			},
		}
	}
}
