//! Measurement provider that delegates to an external speed test program
// (c) 2024 Ross Younger

use std::{process::Stdio, time::Duration};

use anyhow::{Context as _, Result};
use human_repr::HumanDuration as _;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::{MeasurementProvider, ServerDescriptor};
use crate::settings::RunSettings;

/// Runs [speedtest-cli](https://github.com/sivel/speedtest-cli) (or a program with the same
/// command line interface) once per operation, and interprets its output.
#[derive(Debug, Clone)]
pub struct SpeedtestCli {
    program: String,
    options: Vec<String>,
    timeout: Duration,
}

/// The parts of `--json` output we care about.
/// A figure which is absent (or null) was not measured, which is not the same as a reading of 0.
#[derive(Debug, Deserialize)]
struct Report {
    /// bits per second
    download: Option<f64>,
    /// bits per second
    upload: Option<f64>,
    /// milliseconds
    ping: Option<f64>,
}

impl SpeedtestCli {
    /// Standard constructor
    #[must_use]
    pub fn new(settings: &RunSettings) -> Self {
        Self {
            program: settings.backend.clone(),
            options: settings.backend_options.clone(),
            timeout: settings.backend_timeout_duration(),
        }
    }

    /// Runs the backend with the given arguments, returning its standard output
    async fn invoke(&self, args: &[&str]) -> Result<String> {
        let mut cmd = tokio::process::Command::new(&self.program);
        let _ = cmd
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .args(&self.options)
            .args(args);
        debug!("running {} {}", self.program, args.join(" "));

        let output = timeout(self.timeout, cmd.output())
            .await
            .with_context(|| {
                format!(
                    "{} timed out after {}",
                    self.program,
                    self.timeout.human_duration()
                )
            })?
            .with_context(|| format!("could not run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed ({}): {}", self.program, output.status, stderr.trim());
        }
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("{} output: {stdout}", self.program);
        Ok(stdout)
    }

    async fn report(&self, server: &ServerDescriptor, args: &[&str]) -> Result<Report> {
        let mut full = vec!["--server", server.id.as_str()];
        full.extend_from_slice(args);
        full.push("--json");
        let output = self.invoke(&full).await?;
        serde_json::from_str(output.trim())
            .with_context(|| format!("unexpected output from {}", self.program))
    }

    fn connection_args(connections: u16) -> &'static [&'static str] {
        // speedtest-cli can only choose between one connection and its own default
        if connections == 1 {
            &["--single"]
        } else {
            &[]
        }
    }
}

fn bits_to_kbps(bits_per_second: f64) -> f64 {
    bits_per_second / 1024.
}

impl MeasurementProvider for SpeedtestCli {
    async fn fetch_catalog(&self) -> Result<Vec<ServerDescriptor>> {
        let output = self.invoke(&["--list"]).await?;
        Ok(parse_server_list(&output))
    }

    async fn probe_latency(&self, server: &ServerDescriptor) -> Result<f64> {
        let report = self
            .report(server, &["--no-download", "--no-upload"])
            .await?;
        report.ping.context("no ping figure in report")
    }

    async fn measure_download(&self, server: &ServerDescriptor, connections: u16) -> Result<f64> {
        let mut args = vec!["--no-upload"];
        args.extend_from_slice(Self::connection_args(connections));
        let report = self.report(server, &args).await?;
        report
            .download
            .map(bits_to_kbps)
            .context("no download figure in report")
    }

    async fn measure_upload(&self, server: &ServerDescriptor, connections: u16) -> Result<f64> {
        let mut args = vec!["--no-download"];
        args.extend_from_slice(Self::connection_args(connections));
        let report = self.report(server, &args).await?;
        report
            .upload
            .map(bits_to_kbps)
            .context("no upload figure in report")
    }
}

/// Parses the output of `speedtest-cli --list`.
/// Lines that do not describe a server (banners, blank lines) are skipped.
fn parse_server_list(text: &str) -> Vec<ServerDescriptor> {
    text.lines().filter_map(parse_server_line).collect()
}

/// Parses one line of the form `  1234) Sponsor (Name, Country) [12.34 km]`
fn parse_server_line(line: &str) -> Option<ServerDescriptor> {
    let (id, rest) = line.trim().split_once(") ")?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (body, distance) = rest.strip_suffix(" km]")?.rsplit_once(" [")?;
    let km: f64 = distance.trim().parse().ok()?;
    let (sponsor, location) = body.strip_suffix(')')?.rsplit_once(" (")?;
    let (host_name, country) = location.rsplit_once(", ")?;
    Some(ServerDescriptor {
        id: id.to_string(),
        sponsor: sponsor.trim().to_string(),
        host_name: host_name.to_string(),
        country: country.to_string(),
        distance_meters: km * 1000.,
        latency_millis: None,
    })
}
