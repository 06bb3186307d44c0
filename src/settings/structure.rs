//! Settings structure
// (c) 2024 Ross Younger

use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{de, Deserialize, Serialize};
use struct_field_names_as_array::FieldNamesAsSlice;
use strum::VariantNames;

use crate::run::Schedule;

/// How timestamps are written to the result log
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    Serialize,
)]
#[strum(serialize_all = "lowercase")] // N.B. this applies to EnumString, not Display
#[serde(rename_all = "lowercase")]
pub enum TimestampFormat {
    /// Local time, 12-hour clock, e.g. `10/14/2026 03:04:05 PM`
    #[default]
    Local,
    /// RFC 3339 local time with UTC offset, e.g. `2026-10-14T15:04:05+01:00`
    Iso8601,
}

impl<'de> Deserialize<'de> for TimestampFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let lower = s.to_ascii_lowercase();
        // requires strum::EnumString && strum::VariantNames && #[strum(serialize_all = "lowercase")]
        FromStr::from_str(&lower)
            .map_err(|_| de::Error::unknown_variant(&s, TimestampFormat::VARIANTS))
    }
}

impl TimestampFormat {
    /// `chrono` format string for this variant
    #[must_use]
    pub fn pattern(self) -> &'static str {
        match self {
            TimestampFormat::Local => "%m/%d/%Y %I:%M:%S %p",
            TimestampFormat::Iso8601 => "%Y-%m-%dT%H:%M:%S%:z",
        }
    }
}

/// The set of options read from the settings file.
///
/// **Note:** The implementation of `default()` for this struct returns the hard-wired defaults,
/// which are also what gets written out when no settings file exists yet.
///
/// Every field has a default, so a hand-edited file only needs to contain the fields it changes.
// Maintainer note: None of the members of this struct should be Option<anything>; use a sentinel (as with `connections`) instead.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, FieldNamesAsSlice)]
pub struct RunSettings {
    /// Run tests forever, until the process is stopped. If set, `trial_count` is ignored.
    pub unbounded: bool,
    /// Number of tests to run when not `unbounded`
    pub trial_count: u32,
    /// Time between the end of one test and the start of the next, in minutes
    pub interval_minutes: f64,
    /// Where to put the result and event logs. Created if it does not exist.
    pub log_directory: PathBuf,
    /// Timestamp style used in the result log
    pub timestamp_format: TimestampFormat,
    /// How many servers from the top of the catalog to probe for latency
    pub probe_limit: usize,
    /// Number of parallel connections for throughput tests. 0 lets the backend decide.
    pub connections: u16,
    /// The speed test program to run
    pub backend: String,
    /// Additional arguments passed to every backend invocation
    pub backend_options: Vec<String>,
    /// Maximum time any single backend invocation may take [seconds]
    pub backend_timeout: u16,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            unbounded: true,
            trial_count: 1,
            interval_minutes: 5.,
            log_directory: PathBuf::from("./"),
            timestamp_format: TimestampFormat::Local,
            probe_limit: crate::run::DEFAULT_PROBE_LIMIT,
            connections: 0,
            backend: "speedtest-cli".into(),
            backend_options: Vec::new(),
            backend_timeout: 120,
        }
    }
}

impl RunSettings {
    /// Checks the semantic constraints that deserialization cannot express
    pub fn validate(&self) -> Result<(), String> {
        if !self.unbounded && self.trial_count == 0 {
            return Err("trial_count must be at least 1".into());
        }
        if !self.interval_minutes.is_finite()
            || self.interval_minutes < 0.
            || Duration::try_from_secs_f64(self.interval_minutes * 60.).is_err()
        {
            return Err(format!(
                "interval_minutes must be a non-negative number of manageable size (found {})",
                self.interval_minutes
            ));
        }
        if self.probe_limit == 0 {
            return Err("probe_limit must be at least 1".into());
        }
        if self.backend.trim().is_empty() {
            return Err("backend must not be empty".into());
        }
        Ok(())
    }

    /// The scheduling policy these settings describe
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        if self.unbounded {
            Schedule::Unbounded
        } else {
            Schedule::Bounded {
                trials: self.trial_count,
            }
        }
    }

    /// Accessor for `interval_minutes`, as a Duration
    #[must_use]
    pub fn interval(&self) -> Duration {
        // validate() rejects anything out of range; should one slip through, too big means forever
        let seconds = self.interval_minutes * 60.;
        Duration::try_from_secs_f64(seconds).unwrap_or(if seconds > 0. {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }

    /// Accessor for `backend_timeout`, as a Duration
    #[must_use]
    pub fn backend_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.backend_timeout.into())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{RunSettings, TimestampFormat};
    use crate::run::Schedule;

    #[test]
    fn defaults_are_valid() {
        let s = RunSettings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.schedule(), Schedule::Unbounded);
        assert_eq!(s.interval(), Duration::from_secs(300));
    }

    #[test]
    fn bounded_schedule() {
        let s = RunSettings {
            unbounded: false,
            trial_count: 3,
            ..Default::default()
        };
        assert_eq!(s.schedule(), Schedule::Bounded { trials: 3 });
    }

    #[test]
    fn zero_trials_rejected_only_when_bounded() {
        let mut s = RunSettings {
            trial_count: 0,
            ..Default::default()
        };
        assert!(s.validate().is_ok());
        s.unbounded = false;
        assert!(s.validate().unwrap_err().contains("trial_count"));
    }

    #[test]
    fn bad_intervals() {
        for bad in [-1., f64::NAN, f64::INFINITY, 1e300] {
            let s = RunSettings {
                interval_minutes: bad,
                ..Default::default()
            };
            assert!(s.validate().is_err(), "{bad} should be rejected");
        }
        let s = RunSettings {
            interval_minutes: 0.,
            ..Default::default()
        };
        assert!(s.validate().is_ok());
        assert_eq!(s.interval(), Duration::ZERO);
    }

    #[test]
    fn huge_interval_never_collapses_to_zero() {
        let s = RunSettings {
            interval_minutes: 1e300,
            ..Default::default()
        };
        assert!(s.validate().is_err());
        assert_eq!(s.interval(), Duration::MAX);
    }

    #[test]
    fn fractional_interval() {
        let s = RunSettings {
            interval_minutes: 0.5,
            ..Default::default()
        };
        assert_eq!(s.interval(), Duration::from_secs(30));
    }

    #[test]
    fn timestamp_format_case_insensitive() {
        #[derive(serde::Deserialize)]
        struct Test {
            f: TimestampFormat,
        }
        let t: Test = toml::from_str(r#"f = "ISO8601""#).unwrap();
        assert_eq!(t.f, TimestampFormat::Iso8601);
        let err = toml::from_str::<Test>(r#"f = "julian""#).err().unwrap();
        assert!(err.to_string().contains("unknown variant"));
    }

    #[test]
    fn timestamp_format_serializes_lowercase() {
        let s = toml::to_string(&RunSettings::default()).unwrap();
        assert!(s.contains(r#"timestamp_format = "local""#));
    }
}
