//! One-shot `fetch` and `show` commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use tvhepg_core::{EpgEvent, EpgSnapshot};
use tvhepg_server::{EpgStorage, JsonFileStorage, RefreshOutcome};

use crate::commands::build_coordinator;
use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};

/// One server's guide as printed by `fetch` and `show`.
#[derive(Debug, Serialize)]
struct ServerGuide<'a> {
    server: &'a str,
    fetched_at: DateTime<Utc>,
    count: usize,
    events: &'a [EpgEvent],
}

impl<'a> ServerGuide<'a> {
    fn new(server: &'a str, snapshot: &'a EpgSnapshot) -> Self {
        Self {
            server,
            fetched_at: snapshot.fetched_at(),
            count: snapshot.len(),
            events: snapshot.events(),
        }
    }
}

/// Refreshes the selected servers once and prints their guides as JSON.
///
/// Each successful fetch is also persisted, like a daemon refresh.
pub async fn fetch(
    config: &AppConfig,
    server: Option<&str>,
    limit: Option<usize>,
) -> ClientResult<()> {
    let mut config = config.clone();
    if let Some(limit) = limit {
        if limit == 0 {
            return Err(ClientError::config("--limit must be positive"));
        }
        config.epg_limit = limit;
    }
    config.validate()?;

    let mut snapshots = Vec::new();
    for (id, settings) in config.select_servers(server)? {
        let coordinator = build_coordinator(&config, &id, settings)?;
        match coordinator.refresh().await {
            RefreshOutcome::Success(snapshot) => {
                info!(server = %id, events = snapshot.len(), "Fetched EPG");
                snapshots.push((id, snapshot));
            }
            RefreshOutcome::Failure(failure) => {
                return Err(ClientError::Refresh { server: id, failure });
            }
        }
    }

    print_guides(&snapshots)
}

/// Prints the last persisted guide of the selected servers.
pub async fn show(config: &AppConfig, server: Option<&str>) -> ClientResult<()> {
    let data_dir = config.data_dir();

    let mut snapshots = Vec::new();
    for (id, _) in config.select_servers(server)? {
        let storage = JsonFileStorage::for_server(&data_dir, &id);
        match storage.load().await? {
            Some(snapshot) => snapshots.push((id, snapshot)),
            None => eprintln!(
                "{}: no guide stored yet at {} (run `tvhepg fetch`)",
                id,
                storage.path().display()
            ),
        }
    }

    print_guides(&snapshots)
}

fn print_guides(snapshots: &[(String, EpgSnapshot)]) -> ClientResult<()> {
    let guides: Vec<ServerGuide<'_>> = snapshots
        .iter()
        .map(|(id, snapshot)| ServerGuide::new(id, snapshot))
        .collect();
    println!("{}", serde_json::to_string_pretty(&guides)?);
    Ok(())
}
