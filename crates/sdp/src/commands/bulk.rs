//! Bulk commands: CI field updates and user-to-technician conversions.

use anyhow::Result;
use colored::Colorize;
use sdp_core::operations::{CiUpdateExecutor, ConversionExecutor};
use sdp_core::{BatchReport, BatchRunner, SdpClient, TracingObserver};
use std::path::Path;
use std::process::ExitCode;

use super::load_config;
use crate::cli::BulkArgs;

const EXIT_PARTIAL_FAILURE: u8 = 1;

pub async fn update_ci(args: BulkArgs, global_config: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(args.config_file.as_deref().or(global_config))?;
    if config.ci_updates.is_empty() && !args.json {
        println!("{}", "No CI updates specified in configuration".yellow());
    }

    let client = SdpClient::from_config(&config)?;
    let executor = CiUpdateExecutor::new(&client).fetch_before_update(config.fetch_before_update);
    let report = BatchRunner::new(&TracingObserver)
        .run(&config.ci_updates, &executor)
        .await;

    print_report("Update Results", &report, args.json)?;
    Ok(exit_code(&report))
}

pub async fn convert_users(args: BulkArgs, global_config: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(args.config_file.as_deref().or(global_config))?;
    if config.user_conversions.is_empty() && !args.json {
        println!("{}", "No user conversions specified in configuration".yellow());
    }

    let client = SdpClient::from_config(&config)?;
    let executor = ConversionExecutor::new(&client);
    let report = BatchRunner::new(&TracingObserver)
        .run(&config.user_conversions, &executor)
        .await;

    print_report("Conversion Results", &report, args.json)?;
    Ok(exit_code(&report))
}

fn print_report(title: &str, report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        return Ok(());
    }

    for result in &report.results {
        if result.succeeded {
            println!("  {} {}", "✓".green(), result.target_id);
        } else {
            println!(
                "  {} {}: {}",
                "✗".red(),
                result.target_id,
                result.error_detail.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let line = format!("{}: {}", title, report.summary());
    if report.is_success() {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
    }
    Ok(())
}

fn exit_code(report: &BatchReport) -> ExitCode {
    match report.ensure_success() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::warn!(run_id = %report.run_id, "{}", e);
            ExitCode::from(EXIT_PARTIAL_FAILURE)
        }
    }
}
