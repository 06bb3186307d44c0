//! Durable output: the result log and the naming of output files
// (c) 2024 Ross Younger
//!
//! Each process writes a CSV result log with one row per completed test run, and a free text
//! event log (see [`setup_tracing`](crate::util::setup_tracing)).
//! Both are named after the time the process started and are only ever appended to.

mod paths;
pub use paths::{OutputFiles, OutputPaths};

mod results;
pub use results::{ResultLog, RunLogRecord, HEADER};
