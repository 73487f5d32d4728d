//! `run` command: the refresh daemon in the foreground.
//!
//! Wires the server components together:
//! - signal handler (SIGTERM/SIGINT stop, SIGHUP refreshes every server)
//! - one coordinator per configured server, restored from disk
//! - one scheduler per coordinator
//!
//! Blocks until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use tvhepg_server::{
    CoordinatorRegistry, RefreshOutcome, RefreshScheduler, SchedulerConfig, SignalHandler,
};

use crate::commands::build_coordinator;
use crate::config::AppConfig;
use crate::error::ClientResult;

/// How long schedulers get to finish an in-flight refresh on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub async fn run(config: &AppConfig) -> ClientResult<()> {
    config.validate()?;

    let signals = SignalHandler::new();
    signals.spawn_listener()?;

    let registry = build_registry(config).await?;
    info!(
        servers = registry.len(),
        interval_secs = config.refresh_interval_secs,
        data_dir = %config.data_dir().display(),
        "Starting EPG daemon"
    );

    for coordinator in registry.iter() {
        if let Err(e) = coordinator.first_refresh().await {
            warn!(error = %e, "Initial refresh failed, retrying on schedule");
        }
    }

    let scheduler_config = SchedulerConfig::new(config.refresh_interval());
    let schedulers: Vec<_> = registry
        .iter()
        .map(|coordinator| {
            RefreshScheduler::new(coordinator.clone(), scheduler_config.clone())
                .spawn(signals.shutdown().wait())
        })
        .collect();

    let mut refresh_requests = signals.refresh_requests();
    let shutdown = signals.shutdown().wait();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            requested = refresh_requests.next() => {
                if !requested {
                    break;
                }
                refresh_all(&registry).await;
            }
        }
    }

    info!("Shutting down...");
    for scheduler in schedulers {
        if tokio::time::timeout(SHUTDOWN_GRACE, scheduler).await.is_err() {
            warn!("Scheduler did not stop in time");
        }
    }

    info!("Daemon stopped");
    Ok(())
}

async fn build_registry(config: &AppConfig) -> ClientResult<CoordinatorRegistry> {
    let mut registry = CoordinatorRegistry::new();

    for (id, settings) in config.select_servers(None)? {
        let coordinator = Arc::new(build_coordinator(config, &id, settings)?);
        match coordinator.restore().await {
            Ok(Some(snapshot)) => {
                info!(server = %id, events = snapshot.len(), "Loaded persisted guide");
            }
            Ok(None) => {}
            Err(e) => warn!(server = %id, error = %e, "Ignoring unreadable persisted guide"),
        }
        info!(server = %id, source = coordinator.source().name(), "Server registered");
        registry.insert(coordinator)?;
    }

    Ok(registry)
}

async fn refresh_all(registry: &CoordinatorRegistry) {
    match registry.refresh(None).await {
        Ok(outcomes) => {
            for (id, outcome) in outcomes {
                if let RefreshOutcome::Failure(failure) = outcome {
                    warn!(server = %id, %failure, "Requested refresh failed");
                }
            }
        }
        Err(e) => warn!(error = %e, "Refresh request rejected"),
    }
}
