//! Configuration commands.

use std::path::Path;

use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the configuration to stdout with plain-text passwords redacted.
pub fn dump(config: &AppConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, including secret references.
pub fn validate(config: &AppConfig) -> ClientResult<()> {
    config.validate()?;

    for server in &config.servers {
        let id = server.id()?;
        server
            .client_config()
            .map_err(|e| ClientError::config(format!("server {}: {}", id, e)))?;
        println!("{}: ok", id);
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file and data directory paths.
pub fn path(config: &AppConfig, path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    println!("data:   {}", config.data_dir().display());
    Ok(())
}
