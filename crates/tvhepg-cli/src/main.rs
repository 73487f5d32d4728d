//! tvhepg CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use tvhepg_cli::cli::{Cli, Command, ConfigAction};
use tvhepg_cli::commands;
use tvhepg_cli::config::AppConfig;
use tvhepg_cli::error::ClientResult;
use tvhepg_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = match cli.config {
        Some(ref path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    init_tracing(tracing_config(&cli, &config))?;

    match cli.command {
        Command::Run => commands::run::run(&config).await,
        Command::Fetch { server, limit } => {
            commands::fetch::fetch(&config, server.as_deref(), limit).await
        }
        Command::Show { server } => commands::fetch::show(&config, server.as_deref()).await,
        Command::Check { server } => commands::check::run(&config, server.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config, &config_path),
        },
    }
}

fn tracing_config(cli: &Cli, config: &AppConfig) -> TracingConfig {
    let debug = cli.debug || config.debug;
    let tracing = match (&cli.command, debug) {
        (_, true) => TracingConfig::cli_debug(),
        (Command::Run, false) => TracingConfig::daemon(),
        _ => TracingConfig::cli(),
    };

    if cli.json_logs {
        tracing.with_format(TracingOutputFormat::Json)
    } else {
        tracing
    }
}
