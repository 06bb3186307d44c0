// (c) 2024 Ross Younger
//! # Running tests
//!
//! A *run* is one complete test: fetch the server catalog, pick the lowest-latency server
//! from the head of it, then measure download and upload throughput against that server.
//! The [`Scheduler`] performs runs one after another, waiting the configured interval
//! between them, and appends each run's result to the result log.
//!
//! Runs never overlap. A failure in one run is logged and does not affect the next.

mod selector;
pub use selector::{select_best_server, SelectionError, DEFAULT_PROBE_LIMIT};

mod executor;
pub use executor::{run_once, PhaseOutcome, SpeedTestResult};

mod scheduler;
pub use scheduler::{Schedule, Scheduler, State, Summary};

#[cfg(test)]
pub(crate) mod mock;
