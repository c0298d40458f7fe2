use clap::Parser;
use hwipc_cli::{cli::Cli, commands, logging, output};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		output::print_error_stderr(&err);
		std::process::exit(err.exit_code());
	}
}
