use std::path::PathBuf;

use clap::Parser;

pub mod commands;
pub mod global;

pub use commands::{Commands, IndexCommands, ReturnsCommands, ServeArgs, UserCommands};
pub use global::{GlobalFlags, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "vest", version, about = "Vest investment platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the project `config.toml` (defaults to `.vest`)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config_dir: self.config_dir.clone(),
        }
    }
}
