//! Visdom connection configuration.

use crate::{Result, VizlogError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where the Visdom server lives and how to talk to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisdomConfig {
    /// Scheme and host, e.g. `http://localhost`
    pub server: String,
    /// Server port
    pub port: u16,
    /// Path prefix when Visdom is served behind a proxy (e.g. `/visdom`)
    pub base_url: String,
    /// Environment used when a logger does not name one
    pub env: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VisdomConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost".to_string(),
            port: 8097,
            base_url: String::new(),
            env: "main".to_string(),
            timeout_secs: 10,
        }
    }
}

impl VisdomConfig {
    /// Create a new config for the given server.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Default::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Defaults overridden by `VISDOM_SERVER`, `VISDOM_PORT`, `VISDOM_BASE_URL`
    /// and `VISDOM_ENV` where set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(server) = std::env::var("VISDOM_SERVER") {
            config.server = server;
        }
        if let Ok(port) = std::env::var("VISDOM_PORT") {
            config.port = port
                .parse()
                .map_err(|_| VizlogError::Config(format!("invalid VISDOM_PORT '{}'", port)))?;
        }
        if let Ok(base_url) = std::env::var("VISDOM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(env) = std::env::var("VISDOM_ENV") {
            config.env = env;
        }
        Ok(config)
    }

    /// Load from a JSON file; missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = fs::File::open(path.as_ref())?;
        let config = serde_json::from_reader(file)?;
        Ok(config)
    }

    /// Full URL for a server endpoint such as `events` or `save`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let server = self.server.trim_end_matches('/');
        let base = self.base_url.trim_matches('/');
        if base.is_empty() {
            format!("{}:{}/{}", server, self.port, endpoint)
        } else {
            format!("{}:{}/{}/{}", server, self.port, base, endpoint)
        }
    }
}
