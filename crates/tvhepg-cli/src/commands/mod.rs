//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod fetch;
pub mod run;

use std::sync::Arc;

use tvhepg_api::TvhClient;
use tvhepg_server::{JsonFileStorage, RefreshCoordinator};

use crate::config::{AppConfig, ServerSettings};
use crate::error::ClientResult;

/// Builds the client, file storage and coordinator for one server.
pub(crate) fn build_coordinator(
    config: &AppConfig,
    id: &str,
    server: &ServerSettings,
) -> ClientResult<RefreshCoordinator> {
    let client = TvhClient::new(server.client_config()?)?;
    let storage = JsonFileStorage::for_server(config.data_dir(), id);

    Ok(
        RefreshCoordinator::new(id, Arc::new(client), Arc::new(storage))
            .with_epg_limit(config.epg_limit),
    )
}
