//! Relay service binary.

use clap::Parser;
use relay_config::Config;
use relay_service::{bootstrap, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Gasless chip-tap payment relay.
#[derive(Parser)]
#[command(name = "relay", version)]
struct Args {
	/// Path to the TOML configuration file.
	#[arg(long, short, default_value = "config.toml")]
	config: PathBuf,
}

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.init();

	let args = Args::parse();
	if let Err(e) = run(args).await {
		tracing::error!(error = %e, "relay service failed");
		std::process::exit(1);
	}
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_file(&args.config)?;
	tracing::info!(
		relay = %config.relay.id,
		chain_id = config.network.chain_id,
		"starting relay service"
	);

	let api_config = config.api.clone();
	let engine = bootstrap::build_engine(config).await?;
	server::start_server(&api_config, engine).await
}
