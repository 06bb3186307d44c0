// (c) 2024 Ross Younger
//! autospeed: periodic network bandwidth tests
//!
//! autospeed runs a speed test every so often (or a fixed number of times), and records
//! download and upload throughput to a CSV result log alongside a timestamped event log.
//!
//! Each test picks the lowest-latency server from the head of the provider's server catalog,
//! measures download then upload against it, and appends one row to the result log.
//! A failed measurement leaves its column blank; a test which cannot run at all is logged and
//! skipped. Nothing short of an invalid settings file stops the schedule.
//!
//! Measurements are delegated to a [`MeasurementProvider`](provider::MeasurementProvider).
//! The one supplied, [`SpeedtestCli`](provider::SpeedtestCli), drives the
//! `speedtest-cli` program.
//!
//! See [settings] for the settings file.

mod cli;
pub use cli::cli;
mod console;
pub mod output;
pub mod provider;
pub mod run;
pub mod settings;
/// Utilities
pub mod util;
