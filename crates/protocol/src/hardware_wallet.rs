//! Payloads of the hardware-wallet channels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hardware wallet vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
	Ledger,
	Trezor,
}

impl DeviceType {
	pub fn as_str(&self) -> &'static str {
		match self {
			DeviceType::Ledger => "ledger",
			DeviceType::Trezor => "trezor",
		}
	}
}

impl fmt::Display for DeviceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for DeviceType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"ledger" => Ok(DeviceType::Ledger),
			"trezor" => Ok(DeviceType::Trezor),
			other => Err(format!("unknown device type '{other}' (expected ledger or trezor)")),
		}
	}
}

/// Connection state pushed on every attach/detach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnectionSnapshot {
	pub disconnected: bool,
	pub device_type: DeviceType,
	/// Available only once the Cardano app is open on the device.
	pub device_id: Option<String>,
	/// e.g. `nanoS`
	pub device_model: String,
	/// e.g. `Test Name`
	pub device_name: String,
	/// Transport path of the device (HID path on desktop)
	pub path: String,
}

/// Empty acknowledgement returned by broadcast listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

/// Asks the controller to start watching for devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitConnectRequest {}

/// Opens the Cardano app on the device at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoAppRequest {
	pub path: String,
}

/// Version of the Cardano app running on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardanoAppInfo {
	pub major: u32,
	pub minor: u32,
	pub patch: u32,
	#[serde(default)]
	pub device_id: Option<String>,
}

impl fmt::Display for CardanoAppInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
	}
}

/// Derivation request for an account-level extended public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedPublicKeyRequest {
	/// BIP32 path, e.g. `1852'/1815'/0'`
	pub path: String,
	pub is_trezor: bool,
	#[serde(default)]
	pub device_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedPublicKey {
	pub public_key_hex: String,
	pub chain_code_hex: String,
}
