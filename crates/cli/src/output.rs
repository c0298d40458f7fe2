//! Result printing. Results go to stdout, diagnostics to stderr.

use std::error::Error as _;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::{CliError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// Pretty-printed JSON
	Json,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

/// Prints `err` and its source chain to stderr.
pub fn print_error_stderr(err: &CliError) {
	eprintln!("error: {err}");
	let mut source = err.source();
	while let Some(cause) = source {
		eprintln!("  caused by: {cause}");
		source = cause.source();
	}
}
