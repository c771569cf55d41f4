use clap::{Args, Subcommand};

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Open the database, apply migrations and list its tables.
    Migrate,
    /// Manage accounts.
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Inspect investment indices.
    Index {
        #[command(subcommand)]
        action: IndexCommands,
    },
    /// Weekly returns.
    Returns {
        #[command(subcommand)]
        action: ReturnsCommands,
    },
    /// Platform-wide totals.
    Stats,
}

#[derive(Clone, Debug, Args)]
pub struct ServeArgs {
    /// Overrides `server.host`.
    #[arg(long)]
    pub host: Option<String>,
    /// Overrides `server.port`.
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum UserCommands {
    /// Create an account, optionally as an administrator.
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        admin: bool,
    },
    /// Grant the admin role to an existing account.
    Promote {
        email: String,
    },
}

#[derive(Clone, Debug, Subcommand)]
pub enum IndexCommands {
    /// List indices (active only unless `--all`).
    List {
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Debug, Subcommand)]
pub enum ReturnsCommands {
    /// Credit one week of returns to every active investment in an index.
    Distribute {
        /// Index id or slug.
        #[arg(long)]
        index: String,
        /// Weekly rate in percent, e.g. `2.5` or `-0.75`.
        #[arg(long, allow_hyphen_values = true)]
        rate: String,
        /// ISO week (`YYYY-Www`); defaults to the current week.
        #[arg(long)]
        period: Option<String>,
    },
}
