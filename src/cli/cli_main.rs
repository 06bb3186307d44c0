// Main CLI entrypoint
// (c) 2024 Ross Younger

use std::{fmt::Display, path::Path, process::ExitCode};

use anstream::eprintln;
use chrono::Local;
use clap::Parser;
use indicatif::{MultiProgress, ProgressDrawTarget};
use owo_colors::OwoColorize as _;
use tracing::{info, warn};

use super::{
    args::CliArgs,
    styles::{ERROR_S, WARNING_S},
};
use crate::{
    output::{OutputPaths, ResultLog},
    provider::SpeedtestCli,
    run::Scheduler,
    settings::{self, Manager, RunSettings},
    util::setup_tracing,
};

/// Main CLI entrypoint
pub fn cli() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    if args.show_settings {
        return Ok(show_settings(&args.settings));
    }
    run(&args)
}

/// Reports a problem that stops us before logging is available
fn fatal(what: &str, e: &dyn Display) -> ExitCode {
    eprintln!("{} {what}: {e:#}", "ERROR".style(*ERROR_S));
    ExitCode::FAILURE
}

fn show_settings(path: &Path) -> ExitCode {
    if !path.exists() {
        eprintln!(
            "{}: {} does not exist; showing defaults",
            "WARNING".style(*WARNING_S),
            path.display()
        );
        println!("{}", Manager::without_files());
        return ExitCode::SUCCESS;
    }
    let mgr = Manager::with_file(path);
    if let Err(e) = mgr.get() {
        return fatal("invalid settings", &e);
    }
    for field in mgr.unrecognised_fields() {
        eprintln!(
            "{}: unrecognised field `{field}` in {}",
            "WARNING".style(*WARNING_S),
            path.display()
        );
    }
    println!("{mgr}");
    ExitCode::SUCCESS
}

#[tokio::main(flavor = "current_thread")]
async fn run(args: &CliArgs) -> anyhow::Result<ExitCode> {
    let loaded = match settings::load(&args.settings) {
        Ok(l) => l,
        Err(e) => return Ok(fatal("could not load settings", &e)),
    };
    let settings = loaded.settings;

    let files = match OutputPaths::allocate(&settings.log_directory, Local::now()) {
        Ok(p) => p,
        Err(e) => {
            return Ok(fatal(
                &format!(
                    "could not set up output in {}",
                    settings.log_directory.display()
                ),
                &e,
            ))
        }
    };

    let display = if args.quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::stdout())
    };
    setup_tracing(
        args.console_level(),
        args.file_level(),
        &display,
        Some(files.events),
    )
    .inspect_err(|e| eprintln!("{} {e:?}", "ERROR".style(*ERROR_S)))?;

    info!("Finished loading settings");
    if loaded.created {
        info!(
            "{} did not exist, so it was created with default settings",
            args.settings.display()
        );
    }
    log_settings(&settings);

    let paths = files.paths;
    let results = match ResultLog::new(files.results, settings.timestamp_format) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                "Could not write to result log {}: {e}",
                paths.results.display()
            );
            return Ok(ExitCode::FAILURE);
        }
    };
    info!("Results will be written to {}", absolute(&paths.results));
    info!("Events will be written to {}", absolute(&paths.events));

    let provider = SpeedtestCli::new(&settings);
    let mut scheduler =
        Scheduler::new(settings, provider, results, &display).with_profile(args.profile);
    let summary = scheduler.run().await;
    if summary.recorded == 0 {
        warn!("No tests succeeded");
    }
    info!(
        "{} of {} test(s) recorded in {}",
        summary.recorded,
        summary.attempted,
        absolute(&paths.results)
    );
    Ok(ExitCode::SUCCESS)
}

fn log_settings(settings: &RunSettings) {
    if settings.unbounded {
        info!("Mode: unbounded");
    } else {
        info!("Mode: {} test(s)", settings.trial_count);
    }
    info!("Interval: {} minute(s)", settings.interval_minutes);
    info!("Log directory: {}", settings.log_directory.display());
    info!("Timestamp format: {}", settings.timestamp_format);
    info!(
        "Servers probed: {}, connections: {}",
        settings.probe_limit,
        if settings.connections == 0 {
            "auto".to_string()
        } else {
            settings.connections.to_string()
        }
    );
    info!(
        "Backend: {} {}",
        settings.backend,
        settings.backend_options.join(" ")
    );
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
