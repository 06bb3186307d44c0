// Time utilities
// (c) 2024 Ross Younger

use std::{
    cmp::max,
    time::{Duration, Instant},
};

use human_repr::HumanDuration;

#[derive(Debug, Clone)]
/// A simple named stopwatch.
/// This stopwatch does not support resuming or splits.
pub struct Stopwatch {
    name: String,
    start: Instant,
    stop: Option<Instant>,
}

impl Stopwatch {
    /// Creates a running stopwatch.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
            stop: None,
        }
    }

    /// Name accessor
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops this stopwatch. Stopping an already-stopped stopwatch has no effect.
    pub fn stop(&mut self) -> Duration {
        *self.stop.get_or_insert_with(Instant::now) - self.start
    }

    /// Elapsed time, if it has been stopped
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.stop.map(|stop| stop - self.start)
    }

    /// Stops this stopwatch, starts a new one where it left off
    fn chain(&mut self, new_name: &str) -> Self {
        let _ = self.stop();
        Self {
            name: new_name.to_string(),
            start: self.stop.unwrap_or(self.start),
            stop: None,
        }
    }

    /// Formatter for --profile mode
    fn fmt_ln(&self, f: &mut std::fmt::Formatter<'_>, width: usize) -> std::fmt::Result {
        match self.elapsed() {
            Some(t) => writeln!(f, "  {:width$}: {}", self.name, t.human_duration()),
            None => writeln!(f, "  {:width$}: running", self.name),
        }
    }
}

/// A chain of stopwatches, used to time the phases of a test run.
#[derive(Debug, Default, Clone)]
pub struct StopwatchChain {
    watches: Vec<Stopwatch>,
}

impl StopwatchChain {
    /// Creates a chain with its first stopwatch running
    #[must_use]
    pub fn new_running(name: &str) -> Self {
        Self {
            watches: vec![Stopwatch::new(name)],
        }
    }

    /// Stops the current stopwatch (if there is one), adds a new stopwatch to the chain and starts it.
    pub fn next(&mut self, name: &str) {
        let new1 = match self.watches.last_mut() {
            None => Stopwatch::new(name),
            Some(latest) => latest.chain(name),
        };
        self.watches.push(new1);
    }

    /// Stops the current stopwatch.
    pub fn stop(&mut self) {
        let _ = self.watches.last_mut().map(Stopwatch::stop);
    }

    /// Extracts a single stopwatch by name, if it was present
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Stopwatch> {
        self.watches.iter().find(|&sw| sw.name == name)
    }
}

/// Simple display formatting
impl std::fmt::Display for StopwatchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut largest = 0usize;
        for sw in &self.watches {
            largest = max(largest, sw.name.len());
        }

        for sw in &self.watches {
            sw.fmt_ln(f, largest)?;
        }
        Ok(())
    }
}
