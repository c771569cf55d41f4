//! Command handlers. Each takes the loaded config and the global flags.

mod index;
mod migrate;
mod returns;
mod serve;
mod stats;
mod user;

use anyhow::Context;
use vest_config::VestConfig;
use vest_db::service::VestService;

use crate::cli::{Commands, GlobalFlags};

pub async fn dispatch(command: Commands, config: VestConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Serve(args) => serve::handle(&args, config).await,
        Commands::Migrate => migrate::handle(&config, flags).await,
        Commands::User { action } => user::handle(action, &config, flags).await,
        Commands::Index { action } => index::handle(&action, &config, flags).await,
        Commands::Returns { action } => returns::handle(action, &config, flags).await,
        Commands::Stats => stats::handle(&config, flags).await,
    }
}

/// Open the configured database; migrations run on open.
async fn open_service(config: &VestConfig) -> anyhow::Result<VestService> {
    VestService::from_config(config)
        .await
        .context("failed to open the vest database")
}
