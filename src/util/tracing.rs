//! Tracing helpers
// (c) 2024 Ross Younger
//!
//! The event log is simply our tracing output: every event goes to the console
//! and, once the output directory is known, to the event log file.

use std::{
    fs::File,
    io::Write,
    sync::{Arc, Mutex},
};

use indicatif::MultiProgress;
use tracing_subscriber::{fmt, fmt::time::ChronoLocal, prelude::*, EnvFilter, Layer};

const STANDARD_ENV_VAR: &str = "RUST_LOG";
const LOG_FILE_DETAIL_ENV_VAR: &str = "RUST_LOG_FILE_DETAIL";

/// Timestamp format for event log lines
const EVENT_TIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Result type for `filter_for()`
struct FilterResult {
    filter: EnvFilter,
    used_env: bool, // Did we use the environment variable we were requested to?
}

/// Log filter setup:
/// Use a given environment variable; if it wasn't present, log only our own items at a given trace level.
fn filter_for(trace_level: &str, key: &str) -> anyhow::Result<FilterResult> {
    EnvFilter::try_from_env(key)
        .map(|filter| FilterResult {
            filter,
            used_env: true,
        })
        .or_else(|e| {
            // The env var was unset or invalid. Which is it?
            if std::env::var(key).is_ok() {
                anyhow::bail!("{key} (set in environment) was invalid: {e}");
            }
            // It was unset. Fall back.
            Ok(FilterResult {
                filter: EnvFilter::new(format!("{}={trace_level}", env!("CARGO_CRATE_NAME"))),
                used_env: false,
            })
        })
}

/// Set up rust tracing, to console (via the `MultiProgress`) and to the event log file.
///
/// By default we log only our own events, at the given trace levels.
/// This can be overridden by setting `RUST_LOG` (console and file) or `RUST_LOG_FILE_DETAIL` (file only).
///
/// For examples, see <https://docs.rs/tracing-subscriber/0.3.18/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables>
///
/// `event_log` should be open for appending; it is never truncated.
///
/// **CAUTION:** If this function fails, tracing won't be set up; callers must take extra care to report the error.
pub fn setup(
    console_level: &str,
    file_level: &str,
    display: &MultiProgress,
    event_log: Option<File>,
) -> anyhow::Result<()> {
    let mut layers = Vec::new();

    /////// Console output, via the MultiProgress

    let filter = filter_for(console_level, STANDARD_ENV_VAR)?;
    // If we used the environment variable, show log targets; if we did not, we're only logging our own events, so do not show targets.
    let layer = fmt::layer()
        .compact()
        .with_target(filter.used_env)
        .with_timer(ChronoLocal::new(EVENT_TIME_FORMAT.into()))
        .with_writer(ProgressWriter::wrap(display))
        .with_filter(filter.filter)
        .boxed();
    layers.push(layer);

    //////// File output

    if let Some(file) = event_log {
        let out_file = Arc::new(file);
        let filter = if std::env::var(LOG_FILE_DETAIL_ENV_VAR).is_ok() {
            FilterResult {
                filter: EnvFilter::try_from_env(LOG_FILE_DETAIL_ENV_VAR)?,
                used_env: true,
            }
        } else {
            filter_for(file_level, STANDARD_ENV_VAR)?
        };
        let layer = fmt::layer()
            .with_writer(out_file)
            // Same logic for if we used the environment variable.
            .with_target(filter.used_env)
            .compact()
            .with_ansi(false)
            .with_timer(ChronoLocal::new(EVENT_TIME_FORMAT.into()))
            .with_filter(filter.filter)
            .boxed();
        layers.push(layer);
    }

    ////////

    tracing_subscriber::registry().with(layers).init();

    Ok(())
}

/// A wrapper type so tracing can output in a way that doesn't mess up `MultiProgress`
struct ProgressWriter {
    display: MultiProgress,
}

impl ProgressWriter {
    fn wrap(display: &MultiProgress) -> Mutex<Self> {
        Mutex::new(Self {
            display: display.clone(),
        })
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = std::str::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if self.display.is_hidden() {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(msg.as_bytes())?;
            stdout.flush()?;
        } else {
            self.display.println(msg.trim_end_matches('\n'))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
