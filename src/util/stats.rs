// Throughput representation and output
// (c) 2024 Ross Younger

use std::fmt::Display;

/// Throughput reported by a measurement provider.
///
/// Providers report in kbps; results are logged in Mbps, where 1 Mbps = 1024 kbps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    kbps: f64,
}

impl Throughput {
    /// Wraps a provider reading.
    /// Returns None if the reading is not a meaningful throughput (negative or not finite).
    #[must_use]
    pub fn from_kbps(kbps: f64) -> Option<Self> {
        (kbps.is_finite() && kbps >= 0.).then_some(Self { kbps })
    }
    /// Accessor
    #[must_use]
    pub fn kbps(self) -> f64 {
        self.kbps
    }
    /// Megabits per second
    #[must_use]
    pub fn mbps(self) -> f64 {
        self.kbps / 1024.
    }
}

impl Display for Throughput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kbps > 1024. {
            write!(f, "{:.2} Mbps", self.mbps())
        } else {
            write!(f, "{:.2} Kbps", self.kbps)
        }
    }
}
