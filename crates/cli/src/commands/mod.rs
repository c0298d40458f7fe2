mod channels;
mod config;
mod probe;
mod serve;

use crate::cli::{Cli, Commands, ConfigAction};
use crate::config::{default_config_path, load_config};
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	// `config init` creates the file, so it must not require one to exist.
	if let Commands::Config {
		action: ConfigAction::Init { force },
	} = cli.command
	{
		let path = cli.config.unwrap_or_else(default_config_path);
		return config::init(&path, force);
	}

	let loaded = load_config(cli.config.as_deref())?;

	match cli.command {
		Commands::Serve(args) => serve::execute(args, &loaded.config).await,
		Commands::Probe(args) => probe::execute(args, &loaded, cli.verbose, cli.format).await,
		Commands::Channels => channels::execute(cli.format),
		Commands::Config { .. } => config::show(&loaded, cli.format),
	}
}
