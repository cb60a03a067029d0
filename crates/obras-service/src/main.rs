//! Main entry point for the obras order-management service.
//!
//! Wires together the pluggable storage and geocoding implementations,
//! loads configuration, and runs the engine until interrupted. The
//! presentation layer (web UI) consumes the engine's service handles and
//! is deliberately not part of this binary.

use clap::Parser;
use obras_config::Config;
use obras_core::{ObrasBuilder, ObrasFactories};
use std::path::PathBuf;

/// Command-line arguments for the obras service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the obras service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine with all registered implementations
/// 5. Runs until interrupted
#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));

	fmt().with_env_filter(env_filter).with_target(true).init();

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| anyhow::anyhow!("Invalid config path"))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	// Register all available backend implementations
	let factories = ObrasFactories {
		storage_factories: obras_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		geocoder_factories: obras_geocode::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	};

	let engine = ObrasBuilder::new(config).build(factories)?;

	engine.run().await;

	tracing::info!("Stopped service");
	Ok(())
}
