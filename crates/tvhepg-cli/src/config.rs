//! Application configuration.
//!
//! Everything lives in one `config.toml`, `~/.config/tvhepg/config.toml` by
//! default:
//!
//! ```toml
//! refresh_interval_secs = 900
//! epg_limit = 1000
//!
//! [[servers]]
//! id = "living-room"
//! url = "http://tvh.local:9981/"
//! username = "admin"
//! password = "env::TVH_PASSWORD"
//! ```
//!
//! Passwords support secret references (`pass::…`, `env::…`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use tvhepg_api::{ClientConfig, DEFAULT_EPG_LIMIT};
use tvhepg_server::DEFAULT_REFRESH_INTERVAL;

use crate::error::{ClientError, ClientResult};
use crate::secret;

const REDACTED: &str = "<redacted>";

/// Top-level `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Debug logging.
    pub debug: bool,

    /// Seconds between scheduled refreshes.
    pub refresh_interval_secs: u64,

    /// Guide entries requested per refresh.
    pub epg_limit: usize,

    /// Where snapshots are persisted. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Configured TVHeadend servers.
    pub servers: Vec<ServerSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
            epg_limit: DEFAULT_EPG_LIMIT,
            data_dir: None,
            servers: Vec::new(),
        }
    }
}

/// One `[[servers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Identifier; defaults to the URL host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Base URL, e.g. `http://tvh.local:9981`.
    pub url: String,

    pub username: String,

    /// Password or secret reference.
    pub password: String,
}

impl ServerSettings {
    /// Identifier of this server: the explicit `id`, or the URL host.
    ///
    /// The id names the server's guide file in the data directory, so it
    /// must not contain path separators or `..`.
    pub fn id(&self) -> ClientResult<String> {
        let id = match self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Url::parse(self.url.trim())
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    ClientError::config(format!(
                        "cannot derive a server id from URL {:?}",
                        self.url
                    ))
                })?,
        };

        if id.contains(['/', '\\']) || id.contains("..") {
            return Err(ClientError::config(format!(
                "server id {:?} must not contain path separators or \"..\"",
                id
            )));
        }
        Ok(id)
    }

    /// Builds the client settings, resolving the password reference.
    pub fn client_config(&self) -> ClientResult<ClientConfig> {
        let password = secret::resolve(&self.password)?;
        Ok(ClientConfig::new(&self.url, &self.username, password)?)
    }
}

impl AppConfig {
    /// Loads from the default path, or returns defaults if the file is missing.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content)
            .map_err(|e| ClientError::config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tvhepg")
    }

    /// Returns the default data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tvhepg")
    }

    /// Effective data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::default_data_dir)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Checks everything that can be checked without contacting a server.
    ///
    /// Secret references are not resolved here.
    pub fn validate(&self) -> ClientResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(ClientError::config("refresh_interval_secs must be positive"));
        }
        if self.epg_limit == 0 {
            return Err(ClientError::config("epg_limit must be positive"));
        }
        if self.servers.is_empty() {
            return Err(ClientError::config(
                "no servers configured; add a [[servers]] section to config.toml",
            ));
        }

        let mut seen = HashSet::new();
        for server in &self.servers {
            let id = server.id()?;
            if !seen.insert(id.clone()) {
                return Err(ClientError::config(format!("server id {:?} is used twice", id)));
            }
            // Validates the URL and credentials shape with a placeholder password.
            ClientConfig::new(&server.url, &server.username, REDACTED)
                .map_err(|e| ClientError::config(format!("server {}: {}", id, e.message())))?;
            if server.password.is_empty() {
                return Err(ClientError::config(format!("server {}: password is empty", id)));
            }
        }

        Ok(())
    }

    /// Selects servers by id, or all servers when `id` is `None`.
    pub fn select_servers(
        &self,
        id: Option<&str>,
    ) -> ClientResult<Vec<(String, &ServerSettings)>> {
        let mut selected = Vec::new();
        for server in &self.servers {
            let server_id = server.id()?;
            if id.is_none_or(|wanted| wanted == server_id) {
                selected.push((server_id, server));
            }
        }

        match id {
            Some(wanted) if selected.is_empty() => Err(ClientError::config(format!(
                "no server configured with id {:?}",
                wanted
            ))),
            None if selected.is_empty() => Err(ClientError::config("no servers configured")),
            _ => Ok(selected),
        }
    }

    /// Copy safe to print: plain-text passwords are replaced.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for server in &mut config.servers {
            if !secret::is_reference(&server.password) {
                server.password = REDACTED.to_string();
            }
        }
        config
    }
}
