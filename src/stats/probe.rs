// src/stats/probe.rs
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use crate::config::Config;
use crate::stats::host::is_valid_host;

const DEFAULT_CONNECT_PORT: u16 = 80;

lazy_static! {
    static ref PING_TIME: Regex = Regex::new(r"time=([0-9.]+)").expect("ping time pattern");
}

/// Raw latency measurements. Callers must validate the host first.
pub trait Probe: Send + Sync {
    fn ping(&self, host: &str) -> impl Future<Output = Option<f64>> + Send;
    fn connect(&self, host: &str, port: u16) -> impl Future<Output = Option<f64>> + Send;
}

/// Probes through the system `ping` binary and a real TCP dial.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    ping_timeout: Duration,
    connect_timeout: Duration,
}

impl SystemProbe {
    pub fn new(ping_timeout: Duration, connect_timeout: Duration) -> Self {
        Self { ping_timeout, connect_timeout }
    }
}

impl Probe for SystemProbe {
    async fn ping(&self, host: &str) -> Option<f64> {
        let mut command = Command::new("ping");
        command
            .args(["-c", "1", "-n", host])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(self.ping_timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("ping could not be started for {}: {}", host, e);
                return None;
            }
            Err(_) => {
                debug!("ping to {} timed out after {:?}", host, self.ping_timeout);
                return None;
            }
        };

        if !output.status.success() {
            debug!("ping to {} exited with {}", host, output.status);
            return None;
        }
        parse_ping_time(&String::from_utf8_lossy(&output.stdout))
    }

    async fn connect(&self, host: &str, port: u16) -> Option<f64> {
        let start = Instant::now();
        match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                let elapsed = start.elapsed();
                drop(stream);
                Some(elapsed.as_secs_f64() * 1000.0)
            }
            Ok(Err(e)) => {
                debug!("tcp ping to {}:{} failed: {}", host, port, e);
                None
            }
            Err(_) => {
                debug!("tcp ping to {}:{} timed out after {:?}", host, port, self.connect_timeout);
                None
            }
        }
    }
}

/// Pulls the first `time=<ms>` figure out of ping's output.
pub fn parse_ping_time(output: &str) -> Option<f64> {
    PING_TIME
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|ms| ms.as_str().parse().ok())
}

/// Gates the raw probes behind the enable flags and the host validator.
#[derive(Debug, Clone)]
pub struct NetworkProbe<P = SystemProbe> {
    probe: P,
    shell_enabled: bool,
    tcp_enabled: bool,
}

impl NetworkProbe<SystemProbe> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SystemProbe::new(config.shell_ping_timeout(), config.tcp_ping_timeout()),
            config.enable_shell_ping,
            config.enable_tcp_ping,
        )
    }
}

impl<P: Probe> NetworkProbe<P> {
    pub fn new(probe: P, shell_enabled: bool, tcp_enabled: bool) -> Self {
        Self { probe, shell_enabled, tcp_enabled }
    }

    pub async fn shell_ping(&self, host: &str) -> Option<f64> {
        if !self.shell_enabled || !is_valid_host(host) {
            return None;
        }
        self.probe.ping(host).await
    }

    pub async fn tcp_ping(&self, host: &str, port: Option<u16>) -> Option<f64> {
        if !self.tcp_enabled || !is_valid_host(host) {
            return None;
        }
        self.probe.connect(host, port.unwrap_or(DEFAULT_CONNECT_PORT)).await
    }

    /// Runs both probes side by side and returns `(shell_ping_ms, tcp_ping_ms)`.
    pub async fn measure(&self, host: &str, port: Option<u16>) -> (Option<f64>, Option<f64>) {
        tokio::join!(self.shell_ping(host), self.tcp_ping(host, port))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    /// Counts attempts and returns fixed latencies.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct CountingProbe {
        pub pings: Arc<AtomicUsize>,
        pub connects: Arc<AtomicUsize>,
    }

    impl Probe for CountingProbe {
        async fn ping(&self, _host: &str) -> Option<f64> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            Some(12.5)
        }

        async fn connect(&self, _host: &str, _port: u16) -> Option<f64> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Some(20.0)
        }
    }

    #[test]
    fn parses_linux_ping_output() {
        let output = "PING 10.0.0.1 (10.0.0.1) 56(84) bytes of data.\n\
                      64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=0.045 ms\n";
        assert_eq!(parse_ping_time(output), Some(0.045));
    }

    #[test]
    fn takes_first_time_marker() {
        assert_eq!(parse_ping_time("time=31.2 ms\ntime=99 ms"), Some(31.2));
    }

    #[test]
    fn missing_marker_is_no_measurement() {
        assert_eq!(parse_ping_time("Request timeout for icmp_seq 0"), None);
        assert_eq!(parse_ping_time("time=ms"), None);
        assert_eq!(parse_ping_time("time=..."), None);
    }

    #[tokio::test]
    async fn disabled_probes_do_no_io() {
        let counting = CountingProbe::default();
        let probe = NetworkProbe::new(counting.clone(), false, false);
        assert_eq!(probe.measure("127.0.0.1", Some(2001)).await, (None, None));
        assert_eq!(counting.pings.load(Ordering::SeqCst), 0);
        assert_eq!(counting.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_host_skips_probes() {
        let counting = CountingProbe::default();
        let probe = NetworkProbe::new(counting.clone(), true, true);
        assert_eq!(probe.measure("1.2.3.4;reboot", None).await, (None, None));
        assert_eq!(counting.pings.load(Ordering::SeqCst), 0);
        assert_eq!(counting.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enabled_probes_run_independently() {
        let counting = CountingProbe::default();
        let probe = NetworkProbe::new(counting.clone(), false, true);
        assert_eq!(probe.measure("localhost", None).await, (None, Some(20.0)));
        assert_eq!(counting.pings.load(Ordering::SeqCst), 0);
        assert_eq!(counting.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tcp_connect_measures_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = SystemProbe::new(Duration::from_secs(1), Duration::from_secs(1));
        let ms = probe.connect("127.0.0.1", port).await;
        assert!(ms.is_some_and(|ms| ms >= 0.0));
    }

    #[tokio::test]
    async fn tcp_connect_refused_is_no_measurement() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let probe = SystemProbe::new(Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(probe.connect("127.0.0.1", port).await, None);
    }
}
