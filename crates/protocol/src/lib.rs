//! Wire types shared by both sides of the hardware-wallet IPC bridge.
//!
//! - [`frame`] - transport frames, correlation ids and failure payloads
//! - [`hardware_wallet`] - device snapshots and device request/reply bodies
//! - [`redemption`] - redemption-code certificate requests

pub mod frame;
pub mod hardware_wallet;
pub mod redemption;

pub use frame::{CorrelationId, ErrorKind, Frame, ReplyError, ReplyFrame, RequestFrame};
pub use hardware_wallet::{
	Ack, CardanoAppInfo, CardanoAppRequest, DeviceConnectionSnapshot, DeviceType, ExtendedPublicKey,
	ExtendedPublicKeyRequest, InitConnectRequest,
};
pub use redemption::{ParseRedemptionCodeRequest, ParseRedemptionCodeResponse, RedemptionType};
