//! Client configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{ApiError, ApiResult};

/// Connection settings for one TVHeadend server.
///
/// Built once through [`ClientConfig::new`], which validates and normalizes
/// the URL; the fields cannot change afterwards.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    host: String,
    username: String,
    password: String,
    timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    /// Default total request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

    /// Creates a validated configuration.
    ///
    /// The URL is trimmed and stripped of trailing slashes. It must use the
    /// `http` or `https` scheme and name a host.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for an empty or invalid URL, or for
    /// empty credentials.
    pub fn new(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.as_ref());
        if base_url.is_empty() {
            return Err(ApiError::configuration("server URL is empty"));
        }

        let parsed = Url::parse(&base_url).map_err(|e| {
            ApiError::configuration(format!("invalid server URL {:?}", base_url)).with_source(e)
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::configuration(format!(
                "unsupported URL scheme {:?}, expected http or https",
                parsed.scheme()
            )));
        }
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ApiError::configuration("server URL has no host"))?
            .to_string();

        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::configuration("username and password are required"));
        }

        Ok(Self {
            base_url,
            host,
            username,
            password,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("tvhepg/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the total request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Normalized base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host part of the URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Display title for this server, e.g. `TVHeadend (tvh.local)`.
    pub fn title(&self) -> String {
        format!("TVHeadend ({})", self.host)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Joins the base URL with an absolute API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
