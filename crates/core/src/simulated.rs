//! In-memory device backend.
//!
//! Devices are attached, detached and locked from code, which makes the
//! detector and the request handlers drivable without hardware. Keys are
//! derived deterministically from the device path and the derivation path,
//! so repeated calls return the same key.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hwipc_protocol::{CardanoAppInfo, DeviceType, ExtendedPublicKey, ExtendedPublicKeyRequest};
use parking_lot::Mutex;

use crate::device::{BoxFuture, DeviceBackend, DeviceDescriptor, parse_derivation_path};
use crate::error::DeviceError;

/// Cardano app version reported by simulated devices.
pub const SIMULATED_APP_VERSION: (u32, u32, u32) = (4, 1, 0);

#[derive(Debug, Clone)]
struct SimulatedDevice {
	descriptor: DeviceDescriptor,
	locked: bool,
	app_open: bool,
}

#[derive(Debug, Default)]
struct State {
	devices: Vec<SimulatedDevice>,
	listing_failure: Option<String>,
}

/// Scriptable [`DeviceBackend`]. Clones share the same device set.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
	state: Arc<Mutex<State>>,
}

impl SimulatedBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder form of [`attach`](Self::attach).
	pub fn with_device(self, device: DeviceDescriptor) -> Self {
		self.attach(device);
		self
	}

	/// Plugs a device in. Replaces any device already at the same path.
	pub fn attach(&self, device: DeviceDescriptor) {
		let mut state = self.state.lock();
		state.devices.retain(|d| d.descriptor.path != device.path);
		tracing::debug!(path = %device.path, model = %device.model, "Simulated device attached");
		state.devices.push(SimulatedDevice {
			descriptor: device,
			locked: false,
			app_open: false,
		});
	}

	/// Unplugs the device at `path`. Returns false if nothing was attached there.
	pub fn detach(&self, path: &str) -> bool {
		let mut state = self.state.lock();
		let before = state.devices.len();
		state.devices.retain(|d| d.descriptor.path != path);
		let removed = state.devices.len() != before;
		if removed {
			tracing::debug!(path, "Simulated device detached");
		}
		removed
	}

	/// Locks or unlocks the device at `path`. A locked device refuses to open apps.
	pub fn set_locked(&self, path: &str, locked: bool) -> bool {
		let mut state = self.state.lock();
		match state.devices.iter_mut().find(|d| d.descriptor.path == path) {
			Some(device) => {
				device.locked = locked;
				if locked {
					device.app_open = false;
				}
				true
			}
			None => false,
		}
	}

	/// Makes every `list_devices` call fail with `message` until cleared with `None`.
	pub fn fail_listing(&self, message: Option<&str>) {
		self.state.lock().listing_failure = message.map(str::to_string);
	}

	pub fn devices(&self) -> Vec<DeviceDescriptor> {
		self.state.lock().devices.iter().map(|d| d.descriptor.clone()).collect()
	}
}

impl DeviceBackend for SimulatedBackend {
	fn list_devices(&self) -> BoxFuture<'_, Result<Vec<DeviceDescriptor>, DeviceError>> {
		let result = {
			let state = self.state.lock();
			match &state.listing_failure {
				Some(message) => Err(DeviceError::Backend(message.clone())),
				None => Ok(state.devices.iter().map(|d| d.descriptor.clone()).collect()),
			}
		};
		Box::pin(std::future::ready(result))
	}

	fn open_cardano_app<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<CardanoAppInfo, DeviceError>> {
		let result = {
			let mut state = self.state.lock();
			match state.devices.iter_mut().find(|d| d.descriptor.path == path) {
				None => Err(DeviceError::NotFound(path.to_string())),
				Some(device) if device.locked => Err(DeviceError::Locked(path.to_string())),
				Some(device) => {
					device.app_open = true;
					let (major, minor, patch) = SIMULATED_APP_VERSION;
					Ok(CardanoAppInfo {
						major,
						minor,
						patch,
						device_id: Some(device_id(&device.descriptor)),
					})
				}
			}
		};
		Box::pin(std::future::ready(result))
	}

	fn get_extended_public_key<'a>(
		&'a self,
		request: &'a ExtendedPublicKeyRequest,
	) -> BoxFuture<'a, Result<ExtendedPublicKey, DeviceError>> {
		let result = self.derive_key(request);
		Box::pin(std::future::ready(result))
	}
}

impl SimulatedBackend {
	fn derive_key(&self, request: &ExtendedPublicKeyRequest) -> Result<ExtendedPublicKey, DeviceError> {
		let indices = parse_derivation_path(&request.path)?;
		let state = self.state.lock();

		let device = match &request.device_path {
			Some(path) => state
				.devices
				.iter()
				.find(|d| &d.descriptor.path == path)
				.ok_or_else(|| DeviceError::NotFound(path.clone()))?,
			None => state
				.devices
				.first()
				.ok_or_else(|| DeviceError::NotFound("<any>".to_string()))?,
		};

		let expected = if request.is_trezor { DeviceType::Trezor } else { DeviceType::Ledger };
		if device.descriptor.device_type != expected {
			return Err(DeviceError::WrongDeviceType {
				path: device.descriptor.path.clone(),
				expected: expected.to_string(),
				actual: device.descriptor.device_type.to_string(),
			});
		}
		if device.locked {
			return Err(DeviceError::Locked(device.descriptor.path.clone()));
		}
		// Trezor Connect opens the app on demand; Ledger needs it open first.
		if !device.app_open && expected == DeviceType::Ledger {
			return Err(DeviceError::AppNotOpen(device.descriptor.path.clone()));
		}

		Ok(ExtendedPublicKey {
			public_key_hex: digest_hex(&(&device.descriptor.path, &indices, "public")),
			chain_code_hex: digest_hex(&(&device.descriptor.path, &indices, "chain")),
		})
	}
}

fn device_id(device: &DeviceDescriptor) -> String {
	let mut hasher = DefaultHasher::new();
	(&device.path, &device.model).hash(&mut hasher);
	format!("{:016X}", hasher.finish())
}

/// 32 bytes of hex derived from `value`.
fn digest_hex(value: &impl Hash) -> String {
	(0u8..4)
		.map(|round| {
			let mut hasher = DefaultHasher::new();
			round.hash(&mut hasher);
			value.hash(&mut hasher);
			format!("{:016x}", hasher.finish())
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn nano_s() -> DeviceDescriptor {
		DeviceDescriptor::new(DeviceType::Ledger, "0001", "nanoS", "Test Name")
	}

	fn xpub_request(device_path: Option<&str>) -> ExtendedPublicKeyRequest {
		ExtendedPublicKeyRequest {
			path: "1852'/1815'/0'".to_string(),
			is_trezor: false,
			device_path: device_path.map(str::to_string),
		}
	}

	#[tokio::test]
	async fn attach_and_detach() {
		let backend = SimulatedBackend::new().with_device(nano_s());
		assert_eq!(backend.list_devices().await.unwrap().len(), 1);

		assert!(backend.detach("0001"));
		assert!(!backend.detach("0001"));
		assert!(backend.list_devices().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn listing_failure_is_scriptable() {
		let backend = SimulatedBackend::new();
		backend.fail_listing(Some("hid enumeration failed"));
		assert_eq!(
			backend.list_devices().await.unwrap_err(),
			DeviceError::Backend("hid enumeration failed".to_string())
		);

		backend.fail_listing(None);
		assert!(backend.list_devices().await.is_ok());
	}

	#[tokio::test]
	async fn xpub_requires_open_app() {
		let backend = SimulatedBackend::new().with_device(nano_s());
		let request = xpub_request(Some("0001"));

		assert!(matches!(
			backend.get_extended_public_key(&request).await,
			Err(DeviceError::AppNotOpen(_))
		));

		let info = backend.open_cardano_app("0001").await.unwrap();
		assert_eq!((info.major, info.minor, info.patch), SIMULATED_APP_VERSION);
		assert_eq!(info.device_id.as_ref().map(String::len), Some(16));

		let first = backend.get_extended_public_key(&request).await.unwrap();
		let second = backend.get_extended_public_key(&xpub_request(None)).await.unwrap();
		assert_eq!(first, second);
		assert_eq!(first.public_key_hex.len(), 64);
		assert_eq!(first.chain_code_hex.len(), 64);
		assert_ne!(first.public_key_hex, first.chain_code_hex);
	}

	#[tokio::test]
	async fn locked_device_refuses_app() {
		let backend = SimulatedBackend::new().with_device(nano_s());
		assert!(backend.set_locked("0001", true));
		assert_eq!(
			backend.open_cardano_app("0001").await.unwrap_err(),
			DeviceError::Locked("0001".to_string())
		);
		assert!(!backend.set_locked("0002", true));
	}

	#[tokio::test]
	async fn wrong_vendor_is_rejected() {
		let backend = SimulatedBackend::new().with_device(nano_s());
		let mut request = xpub_request(Some("0001"));
		request.is_trezor = true;

		assert!(matches!(
			backend.get_extended_public_key(&request).await,
			Err(DeviceError::WrongDeviceType { .. })
		));
	}

	#[tokio::test]
	async fn unknown_device_path() {
		let backend = SimulatedBackend::new();
		assert_eq!(
			backend.open_cardano_app("0009").await.unwrap_err(),
			DeviceError::NotFound("0009".to_string())
		);
	}
}
