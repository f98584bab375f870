//! Main entry point for the Lanza CLI

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use lanza_cli::cli::Args;
use lanza_common::logging;
use lanza_sdk::SsoConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    // Config is needed first: it decides whether the identity client is traced
    let config = SsoConfig::load(args.config.as_deref())?;

    let default_filter = logging::default_filter("lanza_cli", "warn", config.msal_logging);
    logging::init_logging(&args.verbosity, &default_filter)
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(args.run(config).await?)
}
