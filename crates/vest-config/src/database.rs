//! Database (libSQL) configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "vest.db".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Local database file. `:memory:` opens an ephemeral database.
    #[serde(default = "default_path")]
    pub path: String,

    /// Remote database URL (e.g., `libsql://vest-prod.turso.io`). Overrides `path` when set.
    #[serde(default)]
    pub url: String,

    /// Auth token for the remote database.
    #[serde(default)]
    pub auth_token: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            url: String::new(),
            auth_token: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Remote mode needs both the URL and a token.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.auth_token.is_empty()
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}
