use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mqttoast::config::GlobalConfig;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Forward MQTT messages to desktop notifications.
#[derive(Parser, Debug)]
#[command(name = "mqttoast", version, about)]
struct Args {
	/// Path to the configuration file
	#[arg(long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Enable verbose logging
	#[arg(short, long)]
	verbose: bool,

	/// Enable trace logging
	#[arg(long)]
	debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let level = match (args.debug, args.verbose) {
		| (true, _) => "trace",
		| (false, true) => "debug",
		| (false, false) => "info",
	};
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.init();

	let config = match &args.config {
		| Some(path) => GlobalConfig::load_from(path),
		| None => GlobalConfig::load(),
	}
	.context("failed to load configuration")?;

	if let Err(err) = mqttoast::app::run(config).await {
		error!(error = %err, "Bridge terminated with error");
		return Err(err.into());
	}
	Ok(())
}
