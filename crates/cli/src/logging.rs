use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the global subscriber. Always writes to stderr: in `serve` mode
/// stdout carries frames.
pub fn init_logging(verbosity: u8) {
	// 0 = warnings only, runtime transport noise suppressed
	// 1 (-v) = info: detector state changes, app opens
	// 2+ (-vv) = debug: every frame dispatched
	let filter = match verbosity {
		0 => "warn,hwipc_runtime=error",
		1 => "info",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.with_ansi(std::io::stderr().is_terminal())
		.compact()
		.init();
}
