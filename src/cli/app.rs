use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_local_env_overrides};
use crate::settings::Settings;

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.json_logs)?;
    info!(
        "Starting tenderscout v{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_DATE")
    );

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.configurations_dir {
        settings.configurations_dir = dir.clone();
    }
    let context = CliContext::new(settings, cli.output.clone());

    match dispatch(&cli, &context).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
