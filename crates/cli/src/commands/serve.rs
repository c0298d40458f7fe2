//! `hwipc serve`: the controller side over stdio.

use std::sync::Arc;

use hwipc::{
	HardwareWalletChannels, HardwareWalletService, LineTextExtractor, NoDecryption, RedemptionCodeParser,
	SimulatedBackend, handle_hardware_wallet_requests, handle_redemption_requests, redemption_channel,
};
use hwipc_runtime::{Endpoint, PipeTransport, Side};

use crate::cli::ServeArgs;
use crate::config::{HwipcConfig, parse_device_spec};
use crate::error::Result;

pub async fn execute(args: ServeArgs, config: &HwipcConfig) -> Result<()> {
	let mut config = config.clone();
	config.devices.extend(args.simulate_devices);
	if let Some(ms) = args.poll_interval_ms {
		config.poll_interval_ms = ms;
	}

	let transport = PipeTransport::new(tokio::io::stdout(), tokio::io::stdin()).spawn();
	let endpoint = Endpoint::new(Side::Controller, transport);
	let service = wire_controller(&endpoint, &config)?;

	tracing::info!(
		devices = config.devices.len(),
		channels = ?endpoint.channel_names(),
		"Controller serving on stdio"
	);

	// Returns once the worker closes our stdin.
	endpoint.run().await?;

	if let Some(exit) = service.shutdown().await {
		tracing::debug!(?exit, "Connection detector stopped");
	}
	tracing::info!(dropped_replies = endpoint.dropped_reply_count(), "Controller stopped");
	Ok(())
}

/// Registers every controller-side handler on `endpoint`, backed by a
/// simulated backend holding the configured devices.
pub(crate) fn wire_controller(endpoint: &Endpoint, config: &HwipcConfig) -> Result<HardwareWalletService> {
	let backend = SimulatedBackend::new();
	for spec in &config.devices {
		backend.attach(parse_device_spec(spec)?);
	}

	let channels = HardwareWalletChannels::new(config.request_timeout());
	let service = handle_hardware_wallet_requests(endpoint, &channels, Arc::new(backend), config.detector())?;

	let parser = RedemptionCodeParser::new(Arc::new(NoDecryption), Arc::new(LineTextExtractor));
	handle_redemption_requests(endpoint, &redemption_channel(config.request_timeout()), Arc::new(parser))?;

	Ok(service)
}
