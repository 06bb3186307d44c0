// A single test run
// (c) 2024 Ross Younger

use anyhow::{anyhow, Context as _};
use tracing::{debug, info, warn};

use super::select_best_server;
use crate::{
    provider::{MeasurementProvider, ServerDescriptor},
    settings::RunSettings,
    util::{stats::Throughput, time::StopwatchChain},
};

/// The outcome of one test run.
///
/// Either field may be [`NOT_MEASURED`](Self::NOT_MEASURED) if that phase of the test failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedTestResult {
    /// Mbps
    pub download_mbps: f64,
    /// Mbps
    pub upload_mbps: f64,
}

impl SpeedTestResult {
    /// Sentinel value meaning the measurement failed.
    /// (A genuine reading of zero is zero.)
    pub const NOT_MEASURED: f64 = -1.;

    /// Combines the outcomes of the download and upload phases
    #[must_use]
    pub fn from_phases(download: &PhaseOutcome, upload: &PhaseOutcome) -> Self {
        Self {
            download_mbps: download.mbps(),
            upload_mbps: upload.mbps(),
        }
    }

    /// Download speed, if it was measured
    #[must_use]
    pub fn download(&self) -> Option<f64> {
        (self.download_mbps >= 0.).then_some(self.download_mbps)
    }

    /// Upload speed, if it was measured
    #[must_use]
    pub fn upload(&self) -> Option<f64> {
        (self.upload_mbps >= 0.).then_some(self.upload_mbps)
    }
}

impl Default for SpeedTestResult {
    fn default() -> Self {
        Self {
            download_mbps: Self::NOT_MEASURED,
            upload_mbps: Self::NOT_MEASURED,
        }
    }
}

/// What happened in one throughput phase
#[derive(Debug)]
pub enum PhaseOutcome {
    /// The provider returned a usable reading
    Measured(Throughput),
    /// The measurement failed
    Failed(anyhow::Error),
}

impl PhaseOutcome {
    fn mbps(&self) -> f64 {
        match self {
            PhaseOutcome::Measured(t) => t.mbps(),
            PhaseOutcome::Failed(_) => SpeedTestResult::NOT_MEASURED,
        }
    }
}

#[derive(Debug, Clone, Copy, strum::Display)]
enum Direction {
    Download,
    Upload,
}

/// Runs one throughput phase. Failures are logged and returned, never propagated.
async fn measure<P: MeasurementProvider>(
    provider: &P,
    server: &ServerDescriptor,
    connections: u16,
    direction: Direction,
) -> PhaseOutcome {
    let reading = match direction {
        Direction::Download => provider.measure_download(server, connections).await,
        Direction::Upload => provider.measure_upload(server, connections).await,
    };
    let outcome = match reading {
        Ok(kbps) => Throughput::from_kbps(kbps).map_or_else(
            || PhaseOutcome::Failed(anyhow!("implausible reading {kbps} kbps")),
            PhaseOutcome::Measured,
        ),
        Err(e) => PhaseOutcome::Failed(e),
    };
    match &outcome {
        PhaseOutcome::Measured(t) => info!("{direction} speed: {t}"),
        PhaseOutcome::Failed(e) => warn!(
            "Error testing {} speed, leaving it blank: {e:#}",
            direction.to_string().to_lowercase()
        ),
    }
    outcome
}

/// Performs one complete test run: fetch catalog, select server, test download, test upload.
///
/// Errors fetching the catalog or choosing a server mean the run cannot happen, and are returned.
/// Failure of the download or upload phase is recorded in the result as
/// [`SpeedTestResult::NOT_MEASURED`]; the other phase still runs.
///
/// Each step is timed into `timers`.
pub async fn run_once<P: MeasurementProvider>(
    provider: &P,
    settings: &RunSettings,
    timers: &mut StopwatchChain,
) -> anyhow::Result<SpeedTestResult> {
    timers.next("catalog");
    info!("Getting server list...");
    let catalog = provider
        .fetch_catalog()
        .await
        .context("Failed to retrieve server list")?;
    debug!("catalog has {} servers", catalog.len());

    timers.next("server selection");
    let server = select_best_server(provider, catalog, settings.probe_limit).await?;

    info!("Testing speed...");
    timers.next("download");
    let download = measure(provider, &server, settings.connections, Direction::Download).await;
    timers.next("upload");
    let upload = measure(provider, &server, settings.connections, Direction::Upload).await;
    timers.stop();

    Ok(SpeedTestResult::from_phases(&download, &upload))
}

#[cfg(test)]
mod test {
    use assertables::assert_contains;

    use super::{run_once, SpeedTestResult};
    use crate::{
        run::{mock::MockProvider, SelectionError},
        settings::RunSettings,
        util::time::StopwatchChain,
    };

    async fn run(mock: &MockProvider) -> anyhow::Result<SpeedTestResult> {
        run_once(mock, &RunSettings::default(), &mut StopwatchChain::default()).await
    }

    #[test]
    fn default_is_unmeasured() {
        let r = SpeedTestResult::default();
        assert_eq!(r.download(), None);
        assert_eq!(r.upload(), None);
    }

    #[tokio::test]
    async fn healthy() {
        let mock = MockProvider::healthy();
        let r = run(&mock).await.unwrap();
        assert_eq!(r.download(), Some(10.));
        assert_eq!(r.upload(), Some(5.));
        // both phases ran against the lowest latency server
        assert_eq!(
            *mock.measured.borrow(),
            vec![("2".to_string(), 0), ("2".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn download_failure_is_isolated() {
        let mock = MockProvider {
            download_kbps: None,
            ..MockProvider::healthy()
        };
        let r = run(&mock).await.unwrap();
        assert_eq!(r.download(), None);
        assert_eq!(r.upload(), Some(5.));
    }

    #[tokio::test]
    async fn upload_failure_is_isolated() {
        let mock = MockProvider {
            upload_kbps: None,
            ..MockProvider::healthy()
        };
        let r = run(&mock).await.unwrap();
        assert_eq!(r.download(), Some(10.));
        assert_eq!(r.upload(), None);
    }

    #[tokio::test]
    async fn both_phases_fail() {
        let mock = MockProvider {
            download_kbps: None,
            upload_kbps: None,
            ..MockProvider::healthy()
        };
        let r = run(&mock).await.unwrap();
        assert_eq!(r, SpeedTestResult::default());
    }

    #[tokio::test]
    async fn implausible_reading_is_a_failure() {
        let mock = MockProvider {
            download_kbps: Some(f64::NAN),
            upload_kbps: Some(-20.),
            ..MockProvider::healthy()
        };
        let r = run(&mock).await.unwrap();
        assert_eq!(r, SpeedTestResult::default());
    }

    #[tokio::test]
    async fn zero_throughput_is_recorded() {
        let mock = MockProvider {
            download_kbps: Some(0.),
            ..MockProvider::healthy()
        };
        let r = run(&mock).await.unwrap();
        assert_eq!(r.download(), Some(0.));
    }

    #[tokio::test]
    async fn catalog_failure_is_fatal_to_the_run() {
        let mock = MockProvider {
            failing_fetches: vec![0],
            ..MockProvider::healthy()
        };
        let err = run(&mock).await.unwrap_err();
        assert_contains!(err.to_string(), "server list");
        assert!(mock.probed.borrow().is_empty());
        assert!(mock.measured.borrow().is_empty());
    }

    #[tokio::test]
    async fn selection_failure_is_fatal_to_the_run() {
        let mock = MockProvider::with_latencies(&[None, None]);
        let err = run(&mock).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<SelectionError>(),
            Some(&SelectionError::AllProbesFailed { candidates: 2 })
        );
        assert!(mock.measured.borrow().is_empty());
    }

    #[tokio::test]
    async fn settings_are_passed_through() {
        let mock = MockProvider::with_latencies(&[Some(9.), Some(8.), Some(7.)]);
        let settings = RunSettings {
            probe_limit: 2,
            connections: 4,
            ..Default::default()
        };
        let _ = run_once(&mock, &settings, &mut StopwatchChain::default())
            .await
            .unwrap();
        assert_eq!(mock.probed.borrow().len(), 2);
        assert_eq!(
            *mock.measured.borrow(),
            vec![("2".to_string(), 4), ("2".to_string(), 4)]
        );
    }

    #[tokio::test]
    async fn phases_are_timed() {
        let mock = MockProvider::healthy();
        let mut timers = StopwatchChain::default();
        let _ = run_once(&mock, &RunSettings::default(), &mut timers)
            .await
            .unwrap();
        for phase in ["catalog", "server selection", "download", "upload"] {
            assert!(
                timers.find(phase).and_then(|sw| sw.elapsed()).is_some(),
                "{phase}"
            );
        }
    }
}
