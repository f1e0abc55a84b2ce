//! Server configuration: runtime settings plus the optional team file.

use crate::client_manager::DEFAULT_CLIENT_TIMEOUT;
use log::info;
use serde::Deserialize;
use shared::{TeamInfo, MAX_ROSTER_ENTRIES};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid team file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("max clients must be between 1 and {max}, got {value}")]
    MaxClients { value: usize, max: usize },

    #[error("client timeout must be greater than zero")]
    ClientTimeout,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    pub client_timeout: Duration,
    /// Send a fresh roster when a player who had a team leaves
    pub broadcast_on_disconnect: bool,
    pub operators: Vec<String>,
    /// Secret an operator must present at connect time. Without one no
    /// session is ever privileged.
    pub operator_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_clients: 32,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            broadcast_on_disconnect: true,
            operators: Vec::new(),
            operator_token: None,
        }
    }
}

impl ServerConfig {
    /// Every connected player must fit in one roster datagram
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 || self.max_clients > MAX_ROSTER_ENTRIES {
            return Err(ConfigError::MaxClients {
                value: self.max_clients,
                max: MAX_ROSTER_ENTRIES,
            });
        }
        if self.client_timeout.is_zero() {
            return Err(ConfigError::ClientTimeout);
        }
        Ok(())
    }
}

/// Contents of the JSON team file
///
/// ```json
/// {
///   "teams": [{ "id": "green", "display_name": "Green Team", "color": "green" }],
///   "operators": ["admin"]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamFile {
    #[serde(default)]
    pub teams: Vec<TeamInfo>,
    #[serde(default)]
    pub operators: Vec<String>,
}

impl TeamFile {
    /// Loads the team file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No team file at {}, using default teams", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }
}
