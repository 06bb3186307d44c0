// Scriptable measurement provider for tests
// (c) 2024 Ross Younger

use std::{cell::RefCell, collections::HashMap};

use anyhow::{anyhow, Result};
use tokio::time::Instant;

use crate::provider::{test_server, MeasurementProvider, ServerDescriptor};

/// A provider whose every answer is decided in advance, and which records what it was asked
pub(crate) struct MockProvider {
    pub servers: Vec<ServerDescriptor>,
    /// Latency by server id; a server not listed fails its probe
    pub latencies: HashMap<String, f64>,
    /// None: the measurement fails
    pub download_kbps: Option<f64>,
    /// None: the measurement fails
    pub upload_kbps: Option<f64>,
    /// Which calls to `fetch_catalog` fail (counting from 0)
    pub failing_fetches: Vec<usize>,

    pub fetch_times: RefCell<Vec<Instant>>,
    pub probed: RefCell<Vec<String>>,
    /// (server id, connections) for every throughput measurement
    pub measured: RefCell<Vec<(String, u16)>>,
}

impl MockProvider {
    /// Servers "1", "2", ... with the given latencies. None means that server's probe fails.
    /// Throughput is 10240 kbps down and 5120 kbps up.
    pub(crate) fn with_latencies(latencies: &[Option<f64>]) -> Self {
        let servers: Vec<_> = (1..=latencies.len())
            .map(|i| test_server(&i.to_string()))
            .collect();
        let latencies = servers
            .iter()
            .zip(latencies)
            .filter_map(|(s, l)| l.map(|l| (s.id.clone(), l)))
            .collect();
        Self {
            servers,
            latencies,
            download_kbps: Some(10240.),
            upload_kbps: Some(5120.),
            failing_fetches: Vec::new(),
            fetch_times: RefCell::default(),
            probed: RefCell::default(),
            measured: RefCell::default(),
        }
    }

    /// Three servers, of which "2" is the fastest
    pub(crate) fn healthy() -> Self {
        Self::with_latencies(&[Some(30.), Some(10.), Some(20.)])
    }
}

fn throughput(reading: Option<f64>, what: &str) -> Result<f64> {
    reading.ok_or_else(|| anyhow!("simulated {what} failure"))
}

impl MeasurementProvider for MockProvider {
    async fn fetch_catalog(&self) -> Result<Vec<ServerDescriptor>> {
        let call = {
            let mut times = self.fetch_times.borrow_mut();
            times.push(Instant::now());
            times.len() - 1
        };
        if self.failing_fetches.contains(&call) {
            anyhow::bail!("simulated catalog failure");
        }
        Ok(self.servers.clone())
    }

    async fn probe_latency(&self, server: &ServerDescriptor) -> Result<f64> {
        self.probed.borrow_mut().push(server.id.clone());
        self.latencies
            .get(&server.id)
            .copied()
            .ok_or_else(|| anyhow!("simulated probe failure"))
    }

    async fn measure_download(&self, server: &ServerDescriptor, connections: u16) -> Result<f64> {
        self.measured
            .borrow_mut()
            .push((server.id.clone(), connections));
        throughput(self.download_kbps, "download")
    }

    async fn measure_upload(&self, server: &ServerDescriptor, connections: u16) -> Result<f64> {
        self.measured
            .borrow_mut()
            .push((server.id.clone(), connections));
        throughput(self.upload_kbps, "upload")
    }
}
