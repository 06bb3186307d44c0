// Server selection
// (c) 2024 Ross Younger

use tracing::{debug, info, warn};

use crate::provider::{MeasurementProvider, ServerDescriptor};

/// How many servers from the top of the catalog we probe, unless configured otherwise
pub const DEFAULT_PROBE_LIMIT: usize = 10;

/// Reasons no server could be chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The catalog had nothing in it (after truncation)
    #[error("no servers available")]
    NoServersAvailable,
    /// Every candidate failed its latency probe
    #[error("latency probe failed for all {candidates} candidate servers")]
    AllProbesFailed {
        /// How many servers were probed
        candidates: usize,
    },
}

/// Chooses the server with the lowest latency from among the first `probe_limit` entries of
/// the catalog.
///
/// The catalog is taken in the order the provider gave it; it is not sorted before truncation.
/// Ties go to the server appearing first.
/// A server whose probe fails is left out of the comparison and does not stop the others
/// from being probed.
pub async fn select_best_server<P: MeasurementProvider>(
    provider: &P,
    catalog: Vec<ServerDescriptor>,
    probe_limit: usize,
) -> Result<ServerDescriptor, SelectionError> {
    let mut candidates: Vec<_> = catalog.into_iter().take(probe_limit).collect();
    if candidates.is_empty() {
        return Err(SelectionError::NoServersAvailable);
    }

    info!("Selecting best server by latency...");
    for server in &mut candidates {
        match provider.probe_latency(server).await {
            Ok(ms) if ms.is_finite() && ms >= 0. => {
                server.latency_millis = Some(ms);
                debug!("{server}");
            }
            Ok(ms) => warn!(
                "Ignoring server {} ({}): implausible latency {ms}",
                server.id, server.sponsor
            ),
            Err(e) => warn!(
                "Latency probe failed for server {} ({}): {e:#}",
                server.id, server.sponsor
            ),
        }
    }

    let count = candidates.len();
    let best = candidates
        .into_iter()
        .filter_map(|s| s.latency_millis.map(|ms| (ms, s)))
        .reduce(|best, next| if next.0 < best.0 { next } else { best })
        .map(|(_, s)| s)
        .ok_or(SelectionError::AllProbesFailed { candidates: count })?;

    info!("Best server by latency:");
    info!("{best}");
    Ok(best)
}
