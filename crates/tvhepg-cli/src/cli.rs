//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tvhepg - keep a TVHeadend program guide fresh
#[derive(Debug, Parser)]
#[command(name = "tvhepg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "TVHEPG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the refresh daemon in the foreground
    Run,

    /// Refresh once and print the guide as JSON
    Fetch {
        /// Only this server (default: all configured servers)
        #[arg(long, short)]
        server: Option<String>,

        /// Number of guide entries to request
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Print the last persisted guide
    Show {
        /// Only this server (default: all configured servers)
        #[arg(long, short)]
        server: Option<String>,
    },

    /// Check that servers are reachable and credentials are accepted
    Check {
        /// Only this server (default: all configured servers)
        #[arg(long, short)]
        server: Option<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration, with plain-text passwords redacted
    Dump,

    /// Validate configuration and resolve secrets
    Validate,

    /// Show configuration file path
    Path,
}
