//! CLI error types.

use std::io;

use thiserror::Error;

use tvhepg_api::ApiError;
use tvhepg_core::TracingError;
use tvhepg_server::{RefreshFailure, ServerError, StorageError};

/// Result type for CLI operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by `tvhepg` commands.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A `pass::` or `env::` reference could not be resolved.
    #[error("secret error: {0}")]
    Secret(String),

    /// The TVHeadend client rejected its settings or a request failed.
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    /// A refresh finished but failed.
    #[error("refresh of {server} failed: {failure}")]
    Refresh {
        server: String,
        failure: RefreshFailure,
    },

    /// One or more servers failed the connectivity check.
    #[error("{failed} of {total} server(s) failed the check")]
    Check { failed: usize, total: usize },

    #[error("failed to initialize logging: {0}")]
    Tracing(#[from] TracingError),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
