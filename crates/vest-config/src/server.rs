//! HTTP server configuration.

use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "0.0.0.0".into()
}

const fn default_port() -> u16 {
    8080
}

fn default_upload_dir() -> String {
    "uploads".into()
}

/// 5 MiB.
const fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Root directory for KYC documents and payment proofs.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Maximum size of a single uploaded file.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// `host:port` suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.upload_dir, "uploads");
        assert_eq!(config.max_upload_bytes, 5_242_880);
        assert!(config.cors_origins.is_empty());
    }
}
