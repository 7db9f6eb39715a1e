//! Runtime configuration.
//!
//! Layered: built-in defaults, then an optional YAML file named by
//! `HTTPWIRE_CONFIG`, then the `LISTEN` env var on top.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the server binds, e.g. `127.0.0.1:8080`.
    pub listen_addr: String,

    /// Deadline for one full request/response cycle, in seconds.
    pub request_timeout_secs: u64,

    /// Deadline for connecting to an upstream, in seconds.
    pub connect_timeout_secs: u64,

    /// Base URL prefixed to `/httpbin/*` relay targets.
    pub upstream_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            upstream_base: "http://httpbin.org".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("HTTPWIRE_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {path}"))?;
                Self::from_yaml(&raw)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("parsing config yaml")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
