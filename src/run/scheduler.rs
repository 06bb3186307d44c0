// Test scheduling
// (c) 2024 Ross Younger

use std::{io::Write, time::Duration};

use chrono::Local;
use indicatif::{MultiProgress, ProgressBar};
use tracing::{error, info, warn};

use super::run_once;
use crate::{
    output::{ResultLog, RunLogRecord},
    provider::MeasurementProvider,
    settings::RunSettings,
    util::time::StopwatchChain,
};

const SPINNER_TICK: Duration = Duration::from_millis(150);

/// How many runs to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Keep going until the process is stopped
    Unbounded,
    /// Stop after this many runs
    Bounded {
        /// The number of runs
        trials: u32,
    },
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// More runs are due; this many have happened so far
    Running {
        /// Runs so far
        completed: u32,
    },
    /// Nothing more to do
    Done,
}

impl Schedule {
    /// The state before any runs
    #[must_use]
    pub fn initial(self) -> State {
        match self {
            Schedule::Bounded { trials: 0 } => State::Done,
            _ => State::Running { completed: 0 },
        }
    }

    /// The state after a run has been performed in state `state`
    #[must_use]
    pub fn advance(self, state: State) -> State {
        match (self, state) {
            (_, State::Done) => State::Done,
            (Schedule::Unbounded, State::Running { completed }) => State::Running {
                completed: completed.saturating_add(1),
            },
            (Schedule::Bounded { trials }, State::Running { completed }) => {
                let completed = completed.saturating_add(1);
                if completed >= trials {
                    State::Done
                } else {
                    State::Running { completed }
                }
            }
        }
    }
}

/// What happened over a whole schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Runs started
    pub attempted: u32,
    /// Rows written to the result log
    pub recorded: usize,
}

/// Drives repeated test runs and records their results.
#[derive(Debug)]
pub struct Scheduler<P, W: Write> {
    settings: RunSettings,
    provider: P,
    results: ResultLog<W>,
    display: MultiProgress,
    profile: bool,
}

impl<P: MeasurementProvider, W: Write> Scheduler<P, W> {
    /// Standard constructor
    #[must_use]
    pub fn new(
        settings: RunSettings,
        provider: P,
        results: ResultLog<W>,
        display: &MultiProgress,
    ) -> Self {
        Self {
            settings,
            provider,
            results,
            display: display.clone(),
            profile: false,
        }
    }

    /// Enables logging of elapsed time by phase after each run
    #[must_use]
    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// Accessor
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Gives up the result log
    #[must_use]
    pub fn into_results(self) -> ResultLog<W> {
        self.results
    }

    /// Runs the schedule.
    ///
    /// In unbounded mode this never returns.
    /// No failure of an individual run stops the schedule.
    pub async fn run(&mut self) -> Summary {
        let schedule = self.settings.schedule();
        let mut state = schedule.initial();
        let mut attempted = 0u32;

        while let State::Running { completed } = state {
            self.run_one(completed.saturating_add(1)).await;
            attempted = attempted.saturating_add(1);
            state = schedule.advance(state);
            if state != State::Done {
                self.wait_for_next_run().await;
            }
        }

        info!("All tests completed");
        Summary {
            attempted,
            recorded: self.results.rows(),
        }
    }

    /// One iteration of the schedule. This is the fault boundary: whatever goes wrong is logged here.
    async fn run_one(&mut self, number: u32) {
        info!(
            "===== Beginning Test {number} ({}) =====",
            Local::now().format("%m/%d/%Y %I:%M:%S %p")
        );
        let spinner = self.spinner(format!("Test {number}"));
        let mut timers = StopwatchChain::default();

        let outcome = run_once(&self.provider, &self.settings, &mut timers).await;
        timers.stop();
        spinner.finish_and_clear();

        match outcome {
            Ok(result) => {
                let record = RunLogRecord::new(Local::now(), &result);
                match self.results.append(&record) {
                    Ok(()) => info!("Test complete"),
                    Err(e) => error!("Failed to write to result log: {e}"),
                }
            }
            Err(e) => warn!("Error running speed test. Skipping this one: {e:#}"),
        }

        if self.profile {
            info!("Elapsed time by phase:\n{timers}");
        }
    }

    /// The only place the scheduler suspends between runs
    async fn wait_for_next_run(&self) {
        let interval = self.settings.interval();
        info!(
            "Waiting {} minute(s) until next test",
            self.settings.interval_minutes
        );
        if interval.is_zero() {
            return;
        }
        let next = chrono::Duration::from_std(interval)
            .ok()
            .and_then(|d| Local::now().checked_add_signed(d))
            .map_or_else(
                || "Waiting".to_string(),
                |t| format!("Next test at {}", t.format("%I:%M:%S %p")),
            );
        let spinner = self.spinner(next);
        tokio::time::sleep(interval).await;
        spinner.finish_and_clear();
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if self.display.is_hidden() {
            return ProgressBar::hidden();
        }
        let spinner = self
            .display
            .add(ProgressBar::new_spinner().with_style(crate::console::spinner_style()));
        spinner.set_message(message);
        spinner.enable_steady_tick(SPINNER_TICK);
        spinner
    }
}
