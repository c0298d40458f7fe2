
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Help colors: bold yellow headers, cyan literals.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}

/// Hardware-wallet IPC: serve the controller side over stdio, or probe it.
#[derive(Parser, Debug)]
#[command(name = "hwipc")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format for results
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Config file (default: $XDG_CONFIG_HOME/hwipc/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run the controller side: length-prefixed JSON frames on stdin/stdout.
	Serve(ServeArgs),
	/// Run a worker against a controller: connect, open the Cardano app, fetch the account key.
	Probe(ProbeArgs),
	/// List the hardware-wallet channels.
	Channels,
	/// Show or create the config file.
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
	/// Simulated device, `type:model:path[:name]` (repeatable)
	#[arg(long = "simulate-device", value_name = "SPEC")]
	pub simulate_devices: Vec<String>,

	/// Device polling interval in milliseconds
	#[arg(long, value_name = "MS")]
	pub poll_interval_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
	/// Wire the controller into this process instead of spawning `hwipc serve`
	#[arg(long)]
	pub in_process: bool,

	/// Simulated device given to the controller (repeatable)
	#[arg(long = "device", value_name = "SPEC")]
	pub devices: Vec<String>,

	/// Derivation path of the account key
	#[arg(long, default_value = "1852'/1815'/0'")]
	pub path: String,

	/// How long to wait for a connected device, in milliseconds
	#[arg(long, value_name = "MS", default_value_t = 10_000)]
	pub wait_ms: u64,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
	/// Print the effective configuration and where it was loaded from.
	Show,
	/// Write a config file with default values.
	Init {
		/// Overwrite an existing file
		#[arg(long)]
		force: bool,
	},
}
