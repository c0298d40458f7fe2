//! hwipc - hardware-wallet IPC over typed channels
//!
//! The consumer layer of [`hwipc_runtime`]: the named hardware-wallet channel
//! set, the controller-side handlers, the connection detector that pushes
//! device snapshots to workers, and the redemption-code handler.
//!
//! # Wiring
//!
//! ```ignore
//! use std::sync::Arc;
//! use hwipc::{DetectorConfig, HardwareWalletChannels, SimulatedBackend, handle_hardware_wallet_requests};
//! use hwipc_runtime::{Endpoint, Side, memory};
//!
//! let (controller_parts, worker_parts) = memory::pair();
//! let controller = Endpoint::new(Side::Controller, controller_parts);
//! let worker = Endpoint::new(Side::Worker, worker_parts);
//! controller.spawn();
//! worker.spawn();
//!
//! let channels = HardwareWalletChannels::default();
//! let service = handle_hardware_wallet_requests(
//!     &controller,
//!     &channels,
//!     Arc::new(SimulatedBackend::new()),
//!     DetectorConfig::default(),
//! )?;
//!
//! channels.connection.on_receive(|snapshot| async move { Ok(Ack {}) }, &worker)?;
//! channels.init_connect.request(InitConnectRequest {}, &worker, &worker).await?;
//! ```

pub mod channels;
pub mod detector;
pub mod device;
pub mod error;
pub mod handlers;
pub mod redemption;
pub mod simulated;

pub use channels::{
	CHANNELS, ChannelDescriptor, Direction, HardwareWalletChannels, redemption_channel,
};
pub use detector::{ConnectionDetector, DetectorConfig, DetectorExit, DetectorHandle};
pub use device::{BoxFuture, DeviceBackend, DeviceDescriptor, parse_derivation_path};
pub use error::{DeviceError, Error, Result};
pub use handlers::{HardwareWalletService, handle_hardware_wallet_requests};
pub use redemption::{
	CertificateDecryptor, LineTextExtractor, NoDecryption, PdfTextExtractor, RedemptionCodeParser, RedemptionError,
	handle_redemption_requests,
};
pub use simulated::SimulatedBackend;
