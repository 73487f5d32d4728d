//! HTTP client for the TVHeadend JSON API.
//!
//! Every call is a single authenticated GET with a bounded total timeout.
//! Outcomes are classified in this order:
//! 1. 401 -> `Authentication`
//! 2. any other non-2xx -> `Request`
//! 3. timeout -> `Connection`
//! 4. any other transport failure -> `Connection`

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use tvhepg_core::EpgEvent;

use crate::auth::basic_auth;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::source::{BoxFuture, EpgSource};

/// Path of the EPG grid endpoint.
pub const EPG_PATH: &str = "/api/epg/events/grid";

/// Path of the server info endpoint.
pub const SERVER_INFO_PATH: &str = "/api/serverinfo";

/// Number of entries requested when the caller has no preference.
pub const DEFAULT_EPG_LIMIT: usize = 1000;

/// Error bodies are cut to this many characters before being logged.
const MAX_ERROR_BODY: usize = 200;

/// Response of the EPG grid endpoint.
#[derive(Debug, Deserialize)]
struct EpgGrid {
    #[serde(default)]
    entries: Option<Vec<EpgEvent>>,
    #[serde(rename = "totalCount")]
    total_count: Option<u64>,
}

/// TVHeadend API client.
pub struct TvhClient {
    client: Client,
    config: ClientConfig,
    auth_header: String,
}

impl TvhClient {
    /// Creates a client for the given configuration.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| {
                ApiError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;
        let auth_header = basic_auth(config.username(), config.password());

        Ok(Self {
            client,
            config,
            auth_header,
        })
    }

    /// Convenience constructor from raw settings.
    pub fn connect(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ApiResult<Self> {
        Self::new(ClientConfig::new(base_url, username, password)?)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full URL of the EPG grid request for `limit` entries.
    pub fn epg_url(&self, limit: usize) -> String {
        format!("{}?limit={}", self.config.endpoint(EPG_PATH), limit)
    }

    /// Fetches up to `limit` guide entries.
    ///
    /// A response with a missing or null `entries` is an empty guide, not an
    /// error.
    pub async fn get_epg(&self, limit: usize) -> ApiResult<Vec<EpgEvent>> {
        let body = self.get_json(&self.epg_url(limit)).await?;
        let grid: EpgGrid = serde_json::from_value(body).map_err(|e| {
            ApiError::invalid_response(format!("unexpected EPG grid payload: {}", e))
                .with_source(e)
        })?;
        let entries = grid.entries.unwrap_or_default();

        debug!(
            count = entries.len(),
            total = grid.total_count,
            "Fetched EPG entries"
        );
        Ok(entries)
    }

    /// Fetches the server info object.
    pub async fn get_server_info(&self) -> ApiResult<Map<String, Value>> {
        match self.get_json(&self.config.endpoint(SERVER_INFO_PATH)).await? {
            Value::Object(info) => Ok(info),
            other => Err(ApiError::invalid_response(format!(
                "server info is not a JSON object: {}",
                json_type(&other)
            ))),
        }
    }

    async fn get_json(&self, url: &str) -> ApiResult<Value> {
        trace!(url = %url, "Sending request");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        trace!(status = %status, "Received response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::authentication("invalid username or password"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = truncate(body.trim(), MAX_ERROR_BODY);
            warn!(status = %status, body = %body, "Unexpected response status");
            return Err(ApiError::request(
                status.as_u16(),
                format!("server returned {}: {}", status, body),
            ));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::invalid_response(format!("response is not valid JSON: {}", e)).with_source(e)
        })
    }
}

impl EpgSource for TvhClient {
    fn name(&self) -> &str {
        self.config.host()
    }

    fn fetch_epg(&self, limit: usize) -> BoxFuture<'_, ApiResult<Vec<EpgEvent>>> {
        Box::pin(self.get_epg(limit))
    }

    fn server_info(&self) -> BoxFuture<'_, ApiResult<Map<String, Value>>> {
        Box::pin(self.get_server_info())
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout().with_source(err)
    } else {
        ApiError::connection(format!("request failed: {}", err)).with_source(err)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
