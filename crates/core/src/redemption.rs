//! Redemption-code extraction from certificate files.
//!
//! A certificate is a PDF whose first page carries the redemption code as
//! text item 8, directly above the `REDEMPTION KEY` label at item 9.
//! Encrypted certificates are decrypted to `<path>.pdf` first; that file is
//! always removed once extraction finishes.
//!
//! The cryptography and the PDF engine are external: they plug in through
//! [`CertificateDecryptor`] and [`PdfTextExtractor`].

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hwipc_protocol::{ParseRedemptionCodeRequest, ParseRedemptionCodeResponse, RedemptionType};
use hwipc_runtime::{Channel, Endpoint, HandlerError};
use thiserror::Error;

/// Index of the redemption code among the first page's text items.
pub const CODE_ITEM: usize = 8;
/// Index of the label that marks a genuine certificate.
pub const LABEL_ITEM: usize = 9;
/// Label texts found on genuine certificates.
pub const ACCEPTED_LABELS: [&str; 2] = ["REDEMPTION KEY", "—————— REDEMPTION KEY ——————"];

#[derive(Debug, Error)]
pub enum RedemptionError {
	#[error("Failed to read certificate '{path}': {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to write decrypted certificate '{path}': {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to decrypt {redemption_type} certificate: {message}")]
	Decrypt {
		redemption_type: RedemptionType,
		message: String,
	},

	#[error("Failed to extract certificate text: {0}")]
	Extract(String),

	#[error("Certificate text has no item {index} (found {found})")]
	MissingItem { index: usize, found: usize },

	#[error("Not a valid redemption certificate")]
	InvalidCertificate,
}

/// Decrypts an encrypted certificate for one vend type.
pub trait CertificateDecryptor: Send + Sync {
	fn decrypt(&self, key: &str, redemption_type: RedemptionType, encrypted: &[u8]) -> Result<Vec<u8>, RedemptionError>;
}

/// Extracts the text items of a PDF's first page, in content order.
pub trait PdfTextExtractor: Send + Sync {
	fn first_page_items(&self, path: &Path) -> Result<Vec<String>, RedemptionError>;
}

/// Decryptor for deployments without certificate keys: every encrypted
/// certificate is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecryption;

impl CertificateDecryptor for NoDecryption {
	fn decrypt(&self, _key: &str, redemption_type: RedemptionType, _encrypted: &[u8]) -> Result<Vec<u8>, RedemptionError> {
		Err(RedemptionError::Decrypt {
			redemption_type,
			message: "no certificate decryptor configured".to_string(),
		})
	}
}

/// Reads a plain-text certificate export: one text item per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineTextExtractor;

impl PdfTextExtractor for LineTextExtractor {
	fn first_page_items(&self, path: &Path) -> Result<Vec<String>, RedemptionError> {
		let text = fs::read_to_string(path).map_err(|source| RedemptionError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Ok(text.lines().map(|line| line.trim().to_string()).collect())
	}
}

/// Removes the decrypted copy on drop.
struct TemporaryPdf {
	path: PathBuf,
}

impl Drop for TemporaryPdf {
	fn drop(&mut self) {
		if let Err(e) = fs::remove_file(&self.path) {
			tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove decrypted certificate");
		}
	}
}

/// Where the decrypted copy of `path` is written.
pub fn decrypted_path(path: &Path) -> PathBuf {
	let mut name = OsString::from(path.as_os_str());
	name.push(".pdf");
	PathBuf::from(name)
}

/// Picks the code out of the first page's text items.
pub fn code_from_items(items: &[String]) -> Result<String, RedemptionError> {
	let label = items.get(LABEL_ITEM).ok_or(RedemptionError::MissingItem {
		index: LABEL_ITEM,
		found: items.len(),
	})?;
	if !ACCEPTED_LABELS.contains(&label.as_str()) {
		return Err(RedemptionError::InvalidCertificate);
	}
	Ok(items[CODE_ITEM].clone())
}

pub struct RedemptionCodeParser {
	decryptor: Arc<dyn CertificateDecryptor>,
	extractor: Arc<dyn PdfTextExtractor>,
}

impl RedemptionCodeParser {
	pub fn new(decryptor: Arc<dyn CertificateDecryptor>, extractor: Arc<dyn PdfTextExtractor>) -> Self {
		Self { decryptor, extractor }
	}

	/// Extracts the redemption code. Blocking: reads and writes files.
	pub fn parse(&self, request: &ParseRedemptionCodeRequest) -> Result<String, RedemptionError> {
		match request.decryption_key.as_deref().filter(|key| !key.is_empty()) {
			Some(key) => {
				let encrypted = fs::read(&request.file_path).map_err(|source| RedemptionError::Read {
					path: request.file_path.clone(),
					source,
				})?;
				let decrypted = self.decryptor.decrypt(key, request.redemption_type, &encrypted)?;

				let temporary = TemporaryPdf {
					path: decrypted_path(&request.file_path),
				};
				fs::write(&temporary.path, decrypted).map_err(|source| RedemptionError::Write {
					path: temporary.path.clone(),
					source,
				})?;

				let items = self.extractor.first_page_items(&temporary.path)?;
				code_from_items(&items)
			}
			None => {
				let items = self.extractor.first_page_items(&request.file_path)?;
				code_from_items(&items)
			}
		}
	}

	/// [`parse`](Self::parse) folded into the reply sent to the worker.
	pub fn respond(&self, request: &ParseRedemptionCodeRequest) -> ParseRedemptionCodeResponse {
		match self.parse(request) {
			Ok(redemption_code) => ParseRedemptionCodeResponse::Success { redemption_code },
			Err(RedemptionError::InvalidCertificate) => {
				tracing::warn!(path = %request.file_path.display(), "Invalid redemption certificate");
				ParseRedemptionCodeResponse::InvalidCertificate
			}
			Err(e) => {
				tracing::error!(path = %request.file_path.display(), error = %e, "Error while parsing redemption code");
				ParseRedemptionCodeResponse::Failed { message: e.to_string() }
			}
		}
	}
}

/// Serves `channel` on `endpoint` with `parser`. Parsing runs on the blocking pool.
pub fn handle_redemption_requests(
	endpoint: &Endpoint,
	channel: &Channel<ParseRedemptionCodeRequest, ParseRedemptionCodeResponse>,
	parser: Arc<RedemptionCodeParser>,
) -> hwipc_runtime::Result<()> {
	channel.on_request(
		move |request: ParseRedemptionCodeRequest| {
			let parser = Arc::clone(&parser);
			async move {
				tokio::task::spawn_blocking(move || parser.respond(&request))
					.await
					.map_err(|e| HandlerError::new(format!("redemption parser task failed: {e}")))
			}
		},
		endpoint,
	)
}
