use anyhow::Context;
use clap::Parser;
use vest_config::VestConfig;

mod cli;
mod commands;
mod config_warnings;
mod output;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("vest error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;
    let flags = cli.global_flags();

    let config = match &flags.config_dir {
        Some(dir) => VestConfig::load_from_dir(dir)
            .with_context(|| format!("failed to load config from {}", dir.display()))?,
        None => VestConfig::load_with_dotenv().context("failed to load config")?,
    };
    config_warnings::warn_unconfigured(&config);

    commands::dispatch(cli.command, config, &flags).await
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("VEST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}
