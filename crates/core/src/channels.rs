//! The hardware-wallet channel set.
//!
//! Both processes build the same [`HardwareWalletChannels`] value; the
//! controller registers handlers on it and the worker calls through it.

use std::time::Duration;

use hwipc_protocol::{
	Ack, CardanoAppInfo, CardanoAppRequest, DeviceConnectionSnapshot, ExtendedPublicKey, ExtendedPublicKeyRequest,
	InitConnectRequest, ParseRedemptionCodeRequest, ParseRedemptionCodeResponse,
};
use hwipc_runtime::{Channel, DEFAULT_TIMEOUT};

pub const CONNECTION_CHANNEL: &str = "GET_HARDWARE_WALLET_CONNECTION_CHANNEL";
pub const INIT_LEDGER_CONNECT_CHANNEL: &str = "GET_INIT_LEDGER_CONNECT_CHANNEL";
pub const CARDANO_APP_CHANNEL: &str = "GET_CARDANO_ADA_APP_CHANNEL";
pub const EXTENDED_PUBLIC_KEY_CHANNEL: &str = "GET_EXTENDED_PUBLIC_KEY_CHANNEL";
pub const PARSE_REDEMPTION_CODE_CHANNEL: &str = "PARSE_REDEMPTION_CODE_CHANNEL";

/// Which side serves a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Pushed by the controller, acknowledged by the worker.
	ControllerToWorker,
	/// Requested by the worker, served by the controller.
	WorkerToController,
}

impl Direction {
	pub fn as_str(&self) -> &'static str {
		match self {
			Direction::ControllerToWorker => "controller -> worker",
			Direction::WorkerToController => "worker -> controller",
		}
	}
}

/// Static description of one named channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
	pub name: &'static str,
	pub request: &'static str,
	pub reply: &'static str,
	pub direction: Direction,
}

/// Every channel name in use. Names must stay unique across this table.
pub const CHANNELS: [ChannelDescriptor; 5] = [
	ChannelDescriptor {
		name: CONNECTION_CHANNEL,
		request: "DeviceConnectionSnapshot",
		reply: "Ack",
		direction: Direction::ControllerToWorker,
	},
	ChannelDescriptor {
		name: INIT_LEDGER_CONNECT_CHANNEL,
		request: "InitConnectRequest",
		reply: "Ack",
		direction: Direction::WorkerToController,
	},
	ChannelDescriptor {
		name: CARDANO_APP_CHANNEL,
		request: "CardanoAppRequest",
		reply: "CardanoAppInfo",
		direction: Direction::WorkerToController,
	},
	ChannelDescriptor {
		name: EXTENDED_PUBLIC_KEY_CHANNEL,
		request: "ExtendedPublicKeyRequest",
		reply: "ExtendedPublicKey",
		direction: Direction::WorkerToController,
	},
	ChannelDescriptor {
		name: PARSE_REDEMPTION_CODE_CHANNEL,
		request: "ParseRedemptionCodeRequest",
		reply: "ParseRedemptionCodeResponse",
		direction: Direction::WorkerToController,
	},
];

/// Typed handles for the hardware-wallet channels.
#[derive(Debug, Clone)]
pub struct HardwareWalletChannels {
	/// Connection snapshots pushed by the detector.
	pub connection: Channel<DeviceConnectionSnapshot, Ack>,
	/// Starts the connection detector.
	pub init_connect: Channel<InitConnectRequest, Ack>,
	pub cardano_app: Channel<CardanoAppRequest, CardanoAppInfo>,
	pub extended_public_key: Channel<ExtendedPublicKeyRequest, ExtendedPublicKey>,
}

impl HardwareWalletChannels {
	/// Builds the set with `timeout` applied to every call.
	pub fn new(timeout: Duration) -> Self {
		Self {
			connection: Channel::new(CONNECTION_CHANNEL).with_timeout(timeout),
			init_connect: Channel::new(INIT_LEDGER_CONNECT_CHANNEL).with_timeout(timeout),
			cardano_app: Channel::new(CARDANO_APP_CHANNEL).with_timeout(timeout),
			extended_public_key: Channel::new(EXTENDED_PUBLIC_KEY_CHANNEL).with_timeout(timeout),
		}
	}
}

impl Default for HardwareWalletChannels {
	fn default() -> Self {
		Self::new(DEFAULT_TIMEOUT)
	}
}

/// The redemption-code channel. Separate from [`HardwareWalletChannels`]
/// because it is served by its own handler and needs no device.
pub fn redemption_channel(timeout: Duration) -> Channel<ParseRedemptionCodeRequest, ParseRedemptionCodeResponse> {
	Channel::new(PARSE_REDEMPTION_CODE_CHANNEL).with_timeout(timeout)
}
