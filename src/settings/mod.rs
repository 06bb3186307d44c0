// (c) 2024 Ross Younger
//! # Settings
//!
//! autospeed reads its run-time settings from a single TOML file, by default `./settings.toml`
//! (use `--settings` to point elsewhere).
//! If the file does not exist it is created containing the defaults, so the first run of the
//! program leaves behind a file you can edit.
//!
//! Settings are read once at startup. Changes to the file take effect the next time the program starts.
//!
//! ## Example
//!
//! ```toml
//! # Run 12 tests, one every 15 minutes, then stop
//! unbounded = false
//! trial_count = 12
//! interval_minutes = 15
//! log_directory = "/var/log/autospeed"
//! timestamp_format = "iso8601"
//! ```
//!
//! Any field not given takes its default value. The full list of fields is defined by [RunSettings].
//! `autospeed --show-settings` outputs every field, its current value, and where that value came from.

mod structure;
pub use structure::{RunSettings, TimestampFormat};

mod manager;
pub use manager::{load, Loaded, Manager, SettingsError};

/// Where we look for settings unless told otherwise
pub const DEFAULT_SETTINGS_FILE: &str = "./settings.toml";
