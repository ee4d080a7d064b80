mod cli;
mod version;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::Cli;
use heic2png_core::{BatchReport, Converter, FileSelection, StatusBoard};
use version::BuildInfo;

/// Exit status for failures before any file is processed.
const SETUP_FAILURE: i32 = -1;

fn main() {
    // Exit only once everything owned by run() has been dropped.
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    if cli.version {
        print!("{}", BuildInfo::current());
        return 0;
    }

    if !cli.has_input() {
        eprintln!("no file(s) specified");
        eprintln!("{}", Cli::command().render_usage());
        return SETUP_FAILURE;
    }

    // Log records print above the worker status lines.
    let status = StatusBoard::stderr();
    heic2png_core::init_logging_with_writer("info", status.log_writer());

    let report = match convert(&cli, status) {
        Ok(report) => report,
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::error!(error = %message, "setup failed");
            return SETUP_FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(error = %e, "failed to serialize report"),
        }
    }

    // The error count is the exit status.
    report.exit_code()
}

fn convert(cli: &Cli, status: StatusBoard) -> Result<BatchReport> {
    let selection = match &cli.file {
        Some(file) => FileSelection::Single(file.clone()),
        None => {
            let cwd = std::env::current_dir().context("unable to get working directory")?;
            FileSelection::Directory(cwd)
        }
    };

    let converter = Converter::with_default_decoder(cli.batch_config())
        .context("invalid options")?
        .with_status(status);
    let report = converter
        .run_selection(&selection)
        .context("unable to collect files")?;
    Ok(report)
}
