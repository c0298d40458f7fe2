//! `hwipc channels`: the channel table.

use hwipc::CHANNELS;
use serde_json::json;

use crate::error::Result;
use crate::output::{OutputFormat, print_json};

pub fn execute(format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Json => {
			let rows: Vec<_> = CHANNELS
				.iter()
				.map(|c| {
					json!({
						"name": c.name,
						"request": c.request,
						"reply": c.reply,
						"direction": c.direction.as_str(),
					})
				})
				.collect();
			print_json(&rows)
		}
		OutputFormat::Text => {
			let width = CHANNELS.iter().map(|c| c.name.len()).max().unwrap_or(0);
			for c in &CHANNELS {
				println!(
					"{:<width$}  {:<22}  {} -> {}",
					c.name,
					c.direction.as_str(),
					c.request,
					c.reply
				);
			}
			Ok(())
		}
	}
}
