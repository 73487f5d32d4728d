//! Connectivity check.
//!
//! Mirrors what a setup form would do before saving a server: validate the
//! URL, ask for server info, then request a single guide entry.

use tracing::{debug, error};

use tvhepg_api::{ApiError, ApiErrorKind, TvhClient};

use crate::config::{AppConfig, ServerSettings};
use crate::error::{ClientError, ClientResult};

/// Validation error keys, as a setup form would show them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckError {
    InvalidUrl,
    AuthFailed,
    CannotConnect,
    RequestFailed,
    Unknown,
}

impl CheckError {
    pub fn from_api_error(err: &ApiError) -> Self {
        match err.kind() {
            ApiErrorKind::Configuration => Self::InvalidUrl,
            ApiErrorKind::Authentication => Self::AuthFailed,
            ApiErrorKind::Connection => Self::CannotConnect,
            ApiErrorKind::Request => Self::RequestFailed,
            ApiErrorKind::InvalidResponse => Self::Unknown,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::AuthFailed => "auth_failed",
            Self::CannotConnect => "cannot_connect",
            Self::RequestFailed => "api_error",
            Self::Unknown => "unknown",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid server URL",
            Self::AuthFailed => "invalid credentials",
            Self::CannotConnect => "cannot connect to server",
            Self::RequestFailed => "server returned an error",
            Self::Unknown => "unexpected error",
        }
    }
}

/// Probes one server. Returns its display title on success.
pub async fn probe(server: &ServerSettings) -> Result<String, (CheckError, String)> {
    let config = server
        .client_config()
        .map_err(|e| match e {
            ClientError::Api(api) => (CheckError::from_api_error(&api), api.to_string()),
            other => (CheckError::InvalidUrl, other.to_string()),
        })?;
    let title = config.title();
    let client = TvhClient::new(config).map_err(api_failure)?;

    let info = client.get_server_info().await.map_err(api_failure)?;
    debug!(
        server = %title,
        version = info.get("sw_version").and_then(|v| v.as_str()).unwrap_or("unknown"),
        "Server info"
    );
    client.get_epg(1).await.map_err(api_failure)?;

    Ok(title)
}

fn api_failure(err: ApiError) -> (CheckError, String) {
    let check = CheckError::from_api_error(&err);
    if check == CheckError::Unknown {
        error!(error = ?err, "Unexpected error during connectivity check");
    }
    (check, err.to_string())
}

/// Checks the selected servers and reports each one.
pub async fn run(config: &AppConfig, server: Option<&str>) -> ClientResult<()> {
    let selected = config.select_servers(server)?;
    let total = selected.len();
    let mut failed = 0;

    for (id, settings) in selected {
        match probe(settings).await {
            Ok(title) => println!("{}: ok ({})", id, title),
            Err((check, detail)) => {
                failed += 1;
                println!("{}: {} - {} ({})", id, check.key(), check.message(), detail);
            }
        }
    }

    if failed > 0 {
        return Err(ClientError::Check { failed, total });
    }
    Ok(())
}
