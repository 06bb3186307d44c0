//! Measurement provider interface
// (c) 2024 Ross Younger
//!
//! autospeed does not measure anything itself. It asks a [`MeasurementProvider`] for a
//! catalog of servers, for latency to a server, and for sustained throughput to a server.

use std::fmt::Display;

mod speedtest_cli;
pub use speedtest_cli::SpeedtestCli;

/// A candidate measurement server, as listed in a provider's catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ServerDescriptor {
    /// Provider-specific server identifier
    pub id: String,
    /// Who hosts the server
    pub sponsor: String,
    /// Host or location name
    pub host_name: String,
    /// Country the server is in
    pub country: String,
    /// Distance from here, as estimated by the provider [metres]
    pub distance_meters: f64,
    /// Round trip latency [milliseconds]; None until probed
    pub latency_millis: Option<f64>,
}

impl Display for ServerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        #[allow(clippy::cast_possible_truncation)]
        let km = (self.distance_meters / 1000.).trunc() as i64;
        write!(
            f,
            "Hosted by {} ({}/{}), distance: {km}km, latency: ",
            self.sponsor, self.host_name, self.country
        )?;
        match self.latency_millis {
            Some(ms) => write!(f, "{ms}ms"),
            None => f.write_str("unknown"),
        }
    }
}

/// The capabilities autospeed needs from a speed test backend.
///
/// All operations are fallible; callers decide which failures are fatal to a run.
#[allow(async_fn_in_trait)] // we only ever use this on a single-threaded runtime
pub trait MeasurementProvider {
    /// Retrieves the current list of candidate servers, in the provider's preferred order
    async fn fetch_catalog(&self) -> anyhow::Result<Vec<ServerDescriptor>>;
    /// Measures round trip latency to a server [milliseconds]
    async fn probe_latency(&self, server: &ServerDescriptor) -> anyhow::Result<f64>;
    /// Measures download throughput from a server [kbps].
    /// `connections` of 0 means the provider chooses.
    async fn measure_download(
        &self,
        server: &ServerDescriptor,
        connections: u16,
    ) -> anyhow::Result<f64>;
    /// Measures upload throughput to a server [kbps].
    /// `connections` of 0 means the provider chooses.
    async fn measure_upload(&self, server: &ServerDescriptor, connections: u16)
        -> anyhow::Result<f64>;
}

#[cfg(test)]
pub(crate) fn test_server(id: &str) -> ServerDescriptor {
    ServerDescriptor {
        id: id.into(),
        sponsor: format!("Sponsor {id}"),
        host_name: format!("host{id}"),
        country: "Nowhere".into(),
        distance_meters: 12_345.,
        latency_millis: None,
    }
}
