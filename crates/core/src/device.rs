//! Device backend seam.
//!
//! Vendor SDKs (Ledger HID transport, Trezor Connect) sit behind
//! [`DeviceBackend`]. The channel handlers and the connection detector only
//! ever talk to this trait.

use std::future::Future;
use std::pin::Pin;

use hwipc_protocol::{CardanoAppInfo, DeviceConnectionSnapshot, DeviceType, ExtendedPublicKey, ExtendedPublicKeyRequest};

use crate::error::DeviceError;

/// Boxing alias: async trait methods without `async_trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Offset added to an index by a trailing `'` or `H` in a derivation path.
pub const HARDENED: u32 = 0x8000_0000;

/// A device currently attached to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
	pub device_type: DeviceType,
	/// Transport path; stable for as long as the device stays plugged in.
	pub path: String,
	pub model: String,
	pub name: String,
}

impl DeviceDescriptor {
	pub fn new(device_type: DeviceType, path: impl Into<String>, model: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			device_type,
			path: path.into(),
			model: model.into(),
			name: name.into(),
		}
	}

	/// Snapshot pushed to workers when this device attaches or detaches.
	///
	/// `deviceId` stays `null`: it is only known once the Cardano app is open.
	pub fn snapshot(&self, disconnected: bool) -> DeviceConnectionSnapshot {
		DeviceConnectionSnapshot {
			disconnected,
			device_type: self.device_type,
			device_id: None,
			device_model: self.model.clone(),
			device_name: self.name.clone(),
			path: self.path.clone(),
		}
	}
}

/// Access to attached hardware wallets.
pub trait DeviceBackend: Send + Sync + 'static {
	/// Devices attached right now.
	fn list_devices(&self) -> BoxFuture<'_, Result<Vec<DeviceDescriptor>, DeviceError>>;

	/// Opens (or checks) the Cardano app on the device at `path`.
	fn open_cardano_app<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<CardanoAppInfo, DeviceError>>;

	/// Derives the account-level extended public key.
	fn get_extended_public_key<'a>(
		&'a self,
		request: &'a ExtendedPublicKeyRequest,
	) -> BoxFuture<'a, Result<ExtendedPublicKey, DeviceError>>;
}

/// Parses a BIP32 path such as `1852'/1815'/0'` (an optional leading `m/` is
/// accepted).
pub fn parse_derivation_path(path: &str) -> Result<Vec<u32>, DeviceError> {
	let invalid = |reason: String| DeviceError::InvalidPath {
		path: path.to_string(),
		reason,
	};

	let trimmed = path.strip_prefix("m/").unwrap_or(path);
	if trimmed.is_empty() {
		return Err(invalid("path is empty".to_string()));
	}

	trimmed
		.split('/')
		.map(|segment| {
			let (digits, hardened) = match segment.strip_suffix('\'').or_else(|| segment.strip_suffix('H')) {
				Some(digits) => (digits, true),
				None => (segment, false),
			};
			let index: u32 = digits
				.parse()
				.map_err(|_| invalid(format!("'{segment}' is not an index")))?;
			if index >= HARDENED {
				return Err(invalid(format!("index {index} is out of range")));
			}
			Ok(if hardened { index + HARDENED } else { index })
		})
		.collect()
}
