//! Controller-side request handlers for the hardware-wallet channels.

use std::sync::Arc;

use hwipc_protocol::{Ack, CardanoAppRequest, ExtendedPublicKeyRequest, InitConnectRequest};
use hwipc_runtime::{Endpoint, HandlerError};
use parking_lot::Mutex;

use crate::channels::HardwareWalletChannels;
use crate::detector::{ConnectionDetector, DetectorConfig, DetectorExit, DetectorHandle};
use crate::device::DeviceBackend;
use crate::error::Result;

/// Handle to the registered handlers and the detector they own.
#[derive(Clone)]
pub struct HardwareWalletService {
	detector: Arc<Mutex<Option<DetectorHandle>>>,
}

impl HardwareWalletService {
	/// Whether init-connect has started a detector that is still polling.
	pub fn detector_running(&self) -> bool {
		self.detector.lock().as_ref().is_some_and(|handle| !handle.is_finished())
	}

	/// Stops the detector if one was started.
	pub async fn shutdown(&self) -> Option<DetectorExit> {
		let handle = self.detector.lock().take();
		match handle {
			Some(handle) => Some(handle.stop().await),
			None => None,
		}
	}
}

/// Registers the controller-side handlers on `endpoint`:
///
/// - init-connect starts the connection detector (once; later calls only
///   acknowledge, unless the previous detector gave up)
/// - cardano-app opens the Cardano app through `backend`
/// - extended-public-key derives the account key through `backend`
///
/// The detector pushes snapshots on `channels.connection` through `endpoint`.
pub fn handle_hardware_wallet_requests(
	endpoint: &Endpoint,
	channels: &HardwareWalletChannels,
	backend: Arc<dyn DeviceBackend>,
	detector: DetectorConfig,
) -> Result<HardwareWalletService> {
	let service = HardwareWalletService {
		detector: Arc::new(Mutex::new(None)),
	};

	{
		let slot = Arc::clone(&service.detector);
		let backend = Arc::clone(&backend);
		let connection = channels.connection.clone();
		let endpoint_handle = endpoint.clone();
		channels.init_connect.on_request(
			move |_: InitConnectRequest| {
				let mut slot = slot.lock();
				let running = slot.as_ref().is_some_and(|handle| !handle.is_finished());
				if running {
					tracing::debug!("Connection detector already running");
				} else {
					let handle = ConnectionDetector::new(
						Arc::clone(&backend),
						connection.clone(),
						endpoint_handle.clone(),
						detector,
					)
					.start();
					*slot = Some(handle);
				}
				std::future::ready(Ok(Ack {}))
			},
			endpoint,
		)?;
	}

	{
		let backend = Arc::clone(&backend);
		channels.cardano_app.on_request(
			move |request: CardanoAppRequest| {
				let backend = Arc::clone(&backend);
				async move {
					let info = backend.open_cardano_app(&request.path).await?;
					tracing::info!(path = %request.path, version = %info, "Cardano app opened");
					Ok::<_, HandlerError>(info)
				}
			},
			endpoint,
		)?;
	}

	channels.extended_public_key.on_request(
		move |request: ExtendedPublicKeyRequest| {
			let backend = Arc::clone(&backend);
			async move {
				let key = backend.get_extended_public_key(&request).await?;
				tracing::debug!(path = %request.path, is_trezor = request.is_trezor, "Extended public key derived");
				Ok::<_, HandlerError>(key)
			}
		},
		endpoint,
	)?;

	Ok(service)
}
