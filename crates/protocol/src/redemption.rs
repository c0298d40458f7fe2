//! Redemption-code certificate requests.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Certificate vend type, selects the decryption scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RedemptionType {
	#[default]
	Regular,
	ForceVended,
	RecoveryRegular,
	RecoveryForceVended,
}

impl fmt::Display for RedemptionType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RedemptionType::Regular => "regular",
			RedemptionType::ForceVended => "forceVended",
			RedemptionType::RecoveryRegular => "recoveryRegular",
			RedemptionType::RecoveryForceVended => "recoveryForceVended",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRedemptionCodeRequest {
	pub file_path: PathBuf,
	/// When present the certificate is treated as encrypted.
	#[serde(default)]
	pub decryption_key: Option<String>,
	#[serde(default)]
	pub redemption_type: RedemptionType,
}

/// Outcome of a certificate extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ParseRedemptionCodeResponse {
	#[serde(rename_all = "camelCase")]
	Success { redemption_code: String },
	/// The file is readable but is not a redemption certificate.
	InvalidCertificate,
	Failed { message: String },
}
