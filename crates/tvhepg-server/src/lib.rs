//! Daemon: refresh coordinator, scheduler, storage, registry.
//!
//! This crate keeps a TVHeadend program guide fresh:
//! - [`RefreshCoordinator`] serializes refreshes and publishes the latest
//!   snapshot and the latest failure side by side
//! - [`RefreshScheduler`] ticks the coordinator on a fixed interval
//! - [`EpgStorage`] persists each successful snapshot
//! - [`CoordinatorRegistry`] routes "refresh one / refresh all" requests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tvhepg_api::TvhClient;
//! use tvhepg_server::{MemoryStorage, RefreshCoordinator, RefreshScheduler, SchedulerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TvhClient::connect("http://tvh.local:9981", "admin", "secret")?;
//!     let coordinator = Arc::new(RefreshCoordinator::new(
//!         "living-room",
//!         Arc::new(client),
//!         Arc::new(MemoryStorage::new()),
//!     ));
//!     coordinator.first_refresh().await?;
//!
//!     let scheduler = RefreshScheduler::new(coordinator.clone(), SchedulerConfig::default());
//!     scheduler.run_until(tokio::signal::ctrl_c()).await;
//!     Ok(())
//! }
//! ```

mod coordinator;
mod error;
mod registry;
mod scheduler;
mod signals;
mod storage;

pub use coordinator::{
    FailureReason, PublishedState, RefreshCoordinator, RefreshFailure, RefreshOutcome,
};
pub use error::{ServerError, ServerResult};
pub use registry::CoordinatorRegistry;
pub use scheduler::{DEFAULT_REFRESH_INTERVAL, RefreshScheduler, SchedulerConfig};
pub use signals::{RefreshRequests, ShutdownSignal, SignalHandler};
pub use storage::{EpgStorage, JsonFileStorage, MemoryStorage, StorageError, StorageResult};
