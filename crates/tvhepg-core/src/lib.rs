//! Core types: EPG events, snapshots, tracing setup

pub mod event;
pub mod tracing;

pub use event::{EpgEvent, EpgSnapshot};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
