//! CLI and daemon entry point
//!
//! This crate provides the `tvhepg` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{ClientError, ClientResult};
