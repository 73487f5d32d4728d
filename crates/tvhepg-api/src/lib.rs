//! TVHeadend HTTP API client.
//!
//! - [`TvhClient`] - authenticated GET requests against a TVHeadend server
//! - [`EpgSource`] - the seam the refresh coordinator fetches through
//! - [`ApiError`] - typed failures (authentication, connection, request)
//!
//! # Example
//!
//! ```ignore
//! use tvhepg_api::{ClientConfig, TvhClient};
//!
//! let config = ClientConfig::new("http://tvh.local:9981/", "admin", "secret")?;
//! let client = TvhClient::new(config)?;
//! let events = client.get_epg(1000).await?;
//! ```

mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod source;

pub use client::{DEFAULT_EPG_LIMIT, EPG_PATH, SERVER_INFO_PATH, TvhClient};
pub use config::ClientConfig;
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use source::{BoxFuture, EpgSource};
