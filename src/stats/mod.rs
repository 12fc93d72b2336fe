// src/stats/mod.rs
pub mod extract;
pub mod fetch;
pub mod host;
pub mod normalize;
pub mod probe;

use log::{debug, warn};
use crate::config::Config;
use crate::models::status::{OfflineReason, StatusRecord};
use extract::extract_json;
use fetch::UpstreamFetcher;
use normalize::{normalize, upstream_port, Latency};
use probe::{NetworkProbe, Probe, SystemProbe};

/// Produces one `StatusRecord` per call. Keeps no state of its own between calls.
#[derive(Debug, Clone)]
pub struct StatsService<P = SystemProbe> {
    fetcher: UpstreamFetcher,
    probe: NetworkProbe<P>,
    target_host: Option<String>,
    query_port: Option<u16>,
}

impl StatsService<SystemProbe> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            UpstreamFetcher::from_config(config),
            NetworkProbe::from_config(config),
            config.target_host.clone(),
            config.query_port,
        )
    }
}

impl<P: Probe> StatsService<P> {
    pub fn new(
        fetcher: UpstreamFetcher,
        probe: NetworkProbe<P>,
        target_host: Option<String>,
        query_port: Option<u16>,
    ) -> Self {
        Self { fetcher, probe, target_host, query_port }
    }

    /// Runs one full cycle. Every failure ends up as an offline record.
    pub async fn fetch_server_stats(&self) -> StatusRecord {
        let Some(host) = self.target_host.as_deref() else {
            warn!("No target host configured");
            return StatusRecord::offline(OfflineReason::NoHost);
        };

        let body = match self.fetcher.fetch_primary().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to fetch server status: {}", e);
                return StatusRecord::offline(OfflineReason::NetworkError);
            }
        };

        let raw = match extract_json(&body) {
            Ok(raw) => raw,
            Err(reason) => {
                warn!("Unusable status payload ({} bytes): {}", body.len(), reason);
                return StatusRecord::offline(reason);
            }
        };

        let port = self.query_port.or_else(|| upstream_port(&raw));
        let (perf, (shell_ping_ms, tcp_ping_ms)) = tokio::join!(
            self.fetcher.fetch_secondary(),
            self.probe.measure(host, port)
        );
        debug!(
            "Probes for {}: shell={:?} tcp={:?}, performance data {}",
            host,
            shell_ping_ms,
            tcp_ping_ms,
            if perf.is_some() { "present" } else { "missing" }
        );

        normalize(raw, perf.as_ref(), Latency { shell_ping_ms, tcp_ping_ms })
    }
}
