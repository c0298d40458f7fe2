//! `hwipc probe`: the worker side of a full hardware-wallet handshake.
//!
//! 1. listen for connection snapshots
//! 2. ask the controller to start detection (init-connect)
//! 3. on the first connected snapshot, open the Cardano app on that device
//! 4. fetch the account-level extended public key
//!
//! The controller is either a spawned `hwipc serve` child talking over its
//! stdio, or wired into this process over an in-memory pair.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use hwipc::HardwareWalletChannels;
use hwipc_protocol::{
	Ack, CardanoAppInfo, CardanoAppRequest, DeviceConnectionSnapshot, DeviceType, ExtendedPublicKey,
	ExtendedPublicKeyRequest, InitConnectRequest,
};
use hwipc_runtime::{Endpoint, PipeTransport, Side, memory};
use serde::Serialize;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use super::serve::wire_controller;
use crate::cli::ProbeArgs;
use crate::config::{LoadedConfig, parse_device_spec};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
	pub controller: &'static str,
	pub device: DeviceConnectionSnapshot,
	pub cardano_app: CardanoAppInfo,
	pub extended_public_key: ExtendedPublicKey,
	/// Every snapshot received before the report was printed.
	pub snapshots_seen: usize,
}

enum Controller {
	Child(Child),
	InProcess(hwipc::HardwareWalletService),
}

pub async fn execute(args: ProbeArgs, loaded: &LoadedConfig, verbose: u8, format: OutputFormat) -> Result<()> {
	for spec in &args.devices {
		parse_device_spec(spec)?;
	}

	let (worker, controller) = if args.in_process {
		let (controller_parts, worker_parts) = memory::pair();
		let controller = Endpoint::new(Side::Controller, controller_parts);
		let mut config = loaded.config.clone();
		config.devices.extend(args.devices.iter().cloned());
		let service = wire_controller(&controller, &config)?;
		controller.spawn();
		(Endpoint::new(Side::Worker, worker_parts), Controller::InProcess(service))
	} else {
		let mut child = spawn_serve(&args, loaded, verbose)?;
		let stdin = child.stdin.take().ok_or(CliError::ControllerGone)?;
		let stdout = child.stdout.take().ok_or(CliError::ControllerGone)?;
		let worker = Endpoint::new(Side::Worker, PipeTransport::new(stdin, stdout).spawn());
		(worker, Controller::Child(child))
	};
	worker.spawn();

	let channels = HardwareWalletChannels::new(loaded.config.request_timeout());
	let result = handshake(&worker, &channels, &args).await;

	shutdown(controller).await;

	let report = result?;
	match format {
		OutputFormat::Json => print_json(&report)?,
		OutputFormat::Text => print_text(&report),
	}
	Ok(())
}

async fn handshake(worker: &Endpoint, channels: &HardwareWalletChannels, args: &ProbeArgs) -> Result<ProbeReport> {
	let (snapshot_tx, mut snapshots) = mpsc::unbounded_channel();
	channels.connection.on_receive(
		move |snapshot: DeviceConnectionSnapshot| {
			let snapshot_tx = snapshot_tx.clone();
			async move {
				let _ = snapshot_tx.send(snapshot);
				Ok(Ack {})
			}
		},
		worker,
	)?;

	channels
		.init_connect
		.request(InitConnectRequest {}, worker, worker)
		.await?;
	tracing::info!("Detection started, waiting for a device");

	let mut seen = 0;
	let wait = Duration::from_millis(args.wait_ms);
	let device = tokio::time::timeout(wait, async {
		while let Some(snapshot) = snapshots.recv().await {
			seen += 1;
			if !snapshot.disconnected {
				return Some(snapshot);
			}
		}
		None
	})
	.await
	.ok()
	.flatten()
	.ok_or(CliError::NoDevice { ms: args.wait_ms })?;

	tracing::info!(path = %device.path, model = %device.device_model, "Device connected");

	let cardano_app = channels
		.cardano_app
		.request(CardanoAppRequest { path: device.path.clone() }, worker, worker)
		.await?;

	let extended_public_key = channels
		.extended_public_key
		.request(
			ExtendedPublicKeyRequest {
				path: args.path.clone(),
				is_trezor: device.device_type == DeviceType::Trezor,
				device_path: Some(device.path.clone()),
			},
			worker,
			worker,
		)
		.await?;

	Ok(ProbeReport {
		controller: if args.in_process { "in-process" } else { "child" },
		device,
		cardano_app,
		extended_public_key,
		snapshots_seen: seen,
	})
}

fn spawn_serve(args: &ProbeArgs, loaded: &LoadedConfig, verbose: u8) -> Result<Child> {
	let exe = std::env::current_exe().context("failed to locate the hwipc executable")?;

	let mut command = Command::new(exe);
	if loaded.from_file {
		command.arg("--config").arg(&loaded.path);
	}
	if verbose > 0 {
		command.arg(format!("-{}", "v".repeat(verbose as usize)));
	}
	command.arg("serve");
	for spec in &args.devices {
		command.arg("--simulate-device").arg(spec);
	}

	let child = command
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::inherit())
		.kill_on_drop(true)
		.spawn()
		.context("failed to spawn `hwipc serve`")?;
	tracing::debug!(pid = ?child.id(), "Spawned controller");
	Ok(child)
}

async fn shutdown(controller: Controller) {
	match controller {
		Controller::InProcess(service) => {
			service.shutdown().await;
		}
		Controller::Child(mut child) => {
			// The worker's dispatch task keeps the child's stdin open, so the
			// child would serve forever; stop it directly.
			if let Err(e) = child.kill().await {
				tracing::warn!(error = %e, "Failed to stop controller");
			}
		}
	}
}

fn print_text(report: &ProbeReport) {
	println!(
		"device        {} {} ({}) at {}",
		report.device.device_type, report.device.device_model, report.device.device_name, report.device.path
	);
	println!(
		"cardano app   {}{}",
		report.cardano_app,
		report
			.cardano_app
			.device_id
			.as_deref()
			.map(|id| format!(" (device id {id})"))
			.unwrap_or_default()
	);
	println!("public key    {}", report.extended_public_key.public_key_hex);
	println!("chain code    {}", report.extended_public_key.chain_code_hex);
}
