//! Configuration for the hub server.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Top-level config, loadable from a YAML file. Every field has a sensible
/// default so the server also runs with no file at all; CLI flags override
/// file values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the hub API listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// JSON snapshot file for projects/stubs/instances. When omitted the
    /// store is in-memory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,

    #[serde(default)]
    pub wiremock: WireMockConfig,
}

/// Timeouts for talking to remote WireMock admin APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMockConfig {
    /// Timeout for admin calls (mappings, requests, reset) and stub-test
    /// calls, in seconds.
    #[serde(default = "default_admin_timeout")]
    pub admin_timeout_secs: u64,
    /// Timeout for the health probe, in seconds. Shorter so an unhealthy
    /// instance doesn't stall detail views.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
}

fn default_listen() -> SocketAddr {
    "127.0.0.1:3001".parse().expect("static default address")
}

fn default_admin_timeout() -> u64 {
    10
}

fn default_health_timeout() -> u64 {
    5
}

impl Default for WireMockConfig {
    fn default() -> Self {
        Self {
            admin_timeout_secs: default_admin_timeout(),
            health_timeout_secs: default_health_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_file: None,
            wiremock: WireMockConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
