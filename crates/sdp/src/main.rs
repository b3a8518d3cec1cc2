//! sdp - ServiceDesk Plus admin CLI
//!
//! Bulk CMDB updates and user-to-technician conversion over the SDP REST API.
//!
//! Exit codes: 0 when every item succeeded (an empty batch included),
//! 1 when a batch finished with failures, 2 on fatal errors such as an
//! invalid configuration.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod commands;

use cli::{Cli, Commands};

const EXIT_FATAL: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Scoped to this thread; the runtime never leaves it
    let _guard = match init_tracing(cli.verbose, cli.log_json) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing(verbose: bool, json: bool) -> Result<DefaultGuard> {
    let filter = log_filter(verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;

    let text = (!json).then(|| fmt::layer().with_writer(std::io::stderr));
    let json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    Ok(tracing_subscriber::registry()
        .with(text)
        .with(json)
        .with(filter)
        .set_default())
}

/// `RUST_LOG` when set and valid, otherwise our crates at info (debug with `--verbose`).
fn log_filter(verbose: bool, rust_log: Option<String>) -> Result<EnvFilter> {
    if let Some(filter) = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return Ok(filter);
    }

    let level = if verbose { "debug" } else { "info" };
    Ok(EnvFilter::try_new(format!("sdp={level},sdp_core={level}"))?)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::UpdateCi(args) => commands::bulk::update_ci(args, config_path).await,
        Commands::ConvertUsers(args) => commands::bulk::convert_users(args, config_path).await,
        Commands::Ci(cmd) => commands::lookup::ci(cmd, config_path).await,
        Commands::User(cmd) => commands::lookup::user(cmd, config_path).await,
        Commands::Technician(cmd) => commands::lookup::technician(cmd, config_path).await,
        Commands::List { collection } => commands::lookup::list(collection, config_path).await,
    }
}
