use std::env;
use std::time::Duration;
use std::num::NonZeroU32;
use std::str::FromStr;
use governor::Quota;

pub const DEFAULT_PRIMARY_URL: &str =
    "https://qonzer.live/qV3/index.php?g=armareforger&q=74.63.203.34:2001&p=2&e=1";
pub const DEFAULT_SECONDARY_URL: &str =
    "https://gl-sgp12-ln.qonzer.net/dynamicServerData.json?v=1755357541952";
pub const DEFAULT_HOST: &str = "74.63.203.34";
pub const DEFAULT_QUERY_PORT: u16 = 2001;

#[derive(Clone, Debug)]
pub struct Config {
    // Upstream
    pub primary_url: String,
    pub secondary_url: String,
    pub primary_timeout_ms: u64,
    pub secondary_timeout_ms: u64,

    // Target and probes
    pub target_host: Option<String>,
    pub query_port: Option<u16>,
    pub enable_shell_ping: bool,
    pub enable_tcp_ping: bool,
    pub shell_ping_timeout_ms: u64,
    pub tcp_ping_timeout_ms: u64,

    pub refresh_secs: u64,

    // Status message publishing
    pub discord_token: Option<String>,
    pub status_channel_id: Option<String>,
    pub status_message_id: Option<String>,
    pub discord_timeout_ms: u64,

    // Rate limiting for the query endpoint
    pub query_period_secs: u64,
    pub query_burst_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            secondary_url: DEFAULT_SECONDARY_URL.to_string(),
            primary_timeout_ms: 2000,
            secondary_timeout_ms: 5000,
            target_host: Some(DEFAULT_HOST.to_string()),
            query_port: Some(DEFAULT_QUERY_PORT),
            enable_shell_ping: true,
            enable_tcp_ping: true,
            shell_ping_timeout_ms: 5000,
            tcp_ping_timeout_ms: 4000,
            refresh_secs: 60,
            discord_token: None,
            status_channel_id: None,
            status_message_id: None,
            discord_timeout_ms: 5000,
            query_period_secs: 5,
            query_burst_limit: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset keys keep their defaults; a key that is
    /// set but empty clears optional values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            primary_url: optional("ARMA_SERVER_API").unwrap_or(defaults.primary_url),
            secondary_url: optional("DYNAMIC_SERVER_API").unwrap_or(defaults.secondary_url),
            primary_timeout_ms: parse_or(lookup("PRIMARY_TIMEOUT_MS"), defaults.primary_timeout_ms),
            secondary_timeout_ms: parse_or(lookup("SECONDARY_TIMEOUT_MS"), defaults.secondary_timeout_ms),

            target_host: match lookup("SERVER_HOST") {
                Some(v) => Some(v.trim().to_string()).filter(|v| !v.is_empty()),
                None => defaults.target_host,
            },
            query_port: match lookup("SERVER_QUERY_PORT") {
                Some(v) => v.trim().parse().ok().filter(|p| *p != 0),
                None => defaults.query_port,
            },
            enable_shell_ping: flag("ENABLE_SHELL_PING", defaults.enable_shell_ping),
            enable_tcp_ping: flag("ENABLE_TCP_PING", defaults.enable_tcp_ping),
            shell_ping_timeout_ms: parse_or(lookup("SHELL_PING_TIMEOUT_MS"), defaults.shell_ping_timeout_ms),
            tcp_ping_timeout_ms: parse_or(lookup("TCP_PING_TIMEOUT_MS"), defaults.tcp_ping_timeout_ms),

            refresh_secs: Some(parse_or(lookup("STATS_REFRESH_SECONDS"), 0))
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.refresh_secs),

            discord_token: optional("DISCORD_TOKEN"),
            status_channel_id: optional("STATUS_CHANNEL_ID"),
            status_message_id: optional("STATUS_MESSAGE_ID"),
            discord_timeout_ms: parse_or(lookup("DISCORD_TIMEOUT_MS"), defaults.discord_timeout_ms),

            query_period_secs: parse_or(lookup("QUERY_PERIOD_SECS"), defaults.query_period_secs),
            query_burst_limit: parse_or(lookup("QUERY_BURST_LIMIT"), defaults.query_burst_limit),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }

    pub fn secondary_timeout(&self) -> Duration {
        Duration::from_millis(self.secondary_timeout_ms)
    }

    pub fn shell_ping_timeout(&self) -> Duration {
        Duration::from_millis(self.shell_ping_timeout_ms)
    }

    pub fn tcp_ping_timeout(&self) -> Duration {
        Duration::from_millis(self.tcp_ping_timeout_ms)
    }

    pub fn discord_timeout(&self) -> Duration {
        Duration::from_millis(self.discord_timeout_ms)
    }

    pub fn query_quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.query_burst_limit).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(Duration::from_secs(self.query_period_secs.max(1)))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
