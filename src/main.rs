//! allfiles - flat file listing tool
//!
//! Entry point for the CLI application.

use allfiles::config::{CliArgs, ListingConfig};
use allfiles::error::ListerError;
use allfiles::progress::{print_header, print_summary, ProgressReporter};
use allfiles::session::ListingSession;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const FORCE_BANNER: &str = "\
***---------------------------------------------------***
*** WARNING:                                          ***
*** refusing to create listing without the '-f' flag! ***
***---------------------------------------------------***";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    if args.quick {
        anyhow::bail!("updating is no longer implemented. sorry");
    }

    if !args.force {
        eprintln!("{}", FORCE_BANNER);
        eprintln!("{}", CliArgs::command().render_help());
        anyhow::bail!("refusing to run without --force");
    }

    let config = ListingConfig::from_args(args).context("Invalid configuration")?;

    let walker = config.walker.build(config.prune.clone());
    let mut session = ListingSession::new(config).context("Failed to initialize listing")?;

    let config = session.config();
    let show_progress = config.show_progress;
    let roots: Vec<(String, String)> = config
        .roots
        .iter()
        .map(|r| (r.source.display().to_string(), r.replacement.clone()))
        .collect();
    print_header(&roots, config.store.name(), &config.output);

    // Setup signal handler for graceful shutdown
    let shutdown_flag = session.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    if show_progress {
        session = session.with_progress(ProgressReporter::new());
    }

    let report = session.run(walker.as_ref()).context("Listing failed")?;

    print_summary(
        report.completed,
        report.files_seen,
        report.rows_written,
        report.errors,
        report.bytes,
        report.duration,
        &report.outputs,
    );

    if report.errors > 0 {
        info!(errors = report.errors, "Listing completed with errors");
    }

    if !report.completed {
        return Err(ListerError::Interrupted.into());
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("allfiles=debug,warn")
    } else {
        EnvFilter::new("allfiles=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
