//! Deployment settings file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::{default_config_path, load_config};
use crate::error::ConfigError;
use crate::types::{DEFAULT_CONTAINER_NAME, DEFAULT_CONTAINER_PORT};

/// Engine socket path on a stock Docker install
pub const DEFAULT_ENGINE_SOCKET: &str = "/var/run/docker.sock";

/// Defaults applied to every deployment, read from `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    /// Port the application listens on inside the container
    pub container_port: u16,

    /// Name given to the new container
    pub container_name: String,

    /// Engine socket on the remote host
    pub remote_socket: String,

    /// Engine socket on this machine
    pub local_socket: String,

    /// SSH connection timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Timeout for non-streaming engine requests
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// ssh config file (defaults to `~/.ssh/config`)
    pub ssh_config: Option<PathBuf>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            container_port: DEFAULT_CONTAINER_PORT,
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            remote_socket: DEFAULT_ENGINE_SOCKET.to_string(),
            local_socket: DEFAULT_ENGINE_SOCKET.to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
            ssh_config: None,
        }
    }
}

impl DeploySettings {
    /// Load settings from `path`, or from the default location if it exists
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return load_config(path);
        }

        let default_path = default_config_path();
        if default_path.exists() {
            load_config(&default_path)
        } else {
            tracing::debug!("No settings file at {:?}, using defaults", default_path);
            Ok(Self::default())
        }
    }
}
