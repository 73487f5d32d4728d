//! Server error types.

use std::io;
use thiserror::Error;

use crate::coordinator::RefreshFailure;
use crate::storage::StorageError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (signal handlers, files, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A refresh is already running for this server.
    #[error("A refresh is already running for {server}")]
    RefreshInProgress { server: String },

    /// The first refresh failed, so the server is not ready.
    #[error("Server {server} is not ready: {failure}")]
    NotReady {
        server: String,
        failure: RefreshFailure,
    },

    /// No coordinator is registered under this id.
    #[error("No server configured with id {id:?}")]
    UnknownServer { id: String },

    /// A coordinator with this id is already registered.
    #[error("Server id {id:?} is registered twice")]
    DuplicateServer { id: String },
}

impl ServerError {
    /// Creates a refresh in progress error.
    pub fn refresh_in_progress(server: impl Into<String>) -> Self {
        Self::RefreshInProgress {
            server: server.into(),
        }
    }

    /// Creates a not ready error.
    pub fn not_ready(server: impl Into<String>, failure: RefreshFailure) -> Self {
        Self::NotReady {
            server: server.into(),
            failure,
        }
    }

    /// Creates an unknown server error.
    pub fn unknown_server(id: impl Into<String>) -> Self {
        Self::UnknownServer { id: id.into() }
    }

    /// Creates a duplicate server error.
    pub fn duplicate_server(id: impl Into<String>) -> Self {
        Self::DuplicateServer { id: id.into() }
    }
}
