use std::path::PathBuf;

use clap::ValueEnum;

/// How command results are printed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// Aligned columns.
    Table,
    /// Single-line JSON.
    Raw,
}

/// Flags accepted before or after any subcommand.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub config_dir: Option<PathBuf>,
}
