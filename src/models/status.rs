// src/models/status.rs
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

pub const OFFLINE_NAME: &str = "Server Offline";
pub const UNKNOWN: &str = "Unknown";

/// Why a refresh cycle produced an offline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    NoHost,
    NetworkError,
    NoJsonFound,
    JsonParseFailure,
}

impl fmt::Display for OfflineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHost => write!(f, "No host provided"),
            Self::NetworkError => write!(f, "Network error"),
            Self::NoJsonFound => write!(f, "No JSON found"),
            Self::JsonParseFailure => write!(f, "Failed JSON parse"),
        }
    }
}

impl Serialize for OfflineReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Canonical result of one refresh cycle. Never mutated once handed out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub online: bool,
    pub reason: Option<OfflineReason>,
    pub name: String,
    pub map: String,
    pub password: bool,
    pub players: u32,
    pub max_players: u32,
    pub player_names: Vec<String>,
    pub capacity_pct: f64,
    pub version: Option<String>,
    pub ping: Option<f64>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub connect: Option<String>,
    pub uptime_seconds: Option<u64>,
    pub cpu_avg_load: Option<f64>,
    pub cpu_avg_hz: Option<f64>,
    pub shell_ping_ms: Option<f64>,
    pub tcp_ping_ms: Option<f64>,
    #[serde(rename = "_raw")]
    pub raw: Option<Value>,
}

impl StatusRecord {
    pub fn offline(reason: OfflineReason) -> Self {
        Self {
            online: false,
            reason: Some(reason),
            name: OFFLINE_NAME.to_string(),
            map: UNKNOWN.to_string(),
            password: false,
            players: 0,
            max_players: 0,
            player_names: Vec::new(),
            capacity_pct: 0.0,
            version: None,
            ping: None,
            host: None,
            port: None,
            connect: None,
            uptime_seconds: None,
            cpu_avg_load: None,
            cpu_avg_hz: None,
            shell_ping_ms: None,
            tcp_ping_ms: None,
            raw: None,
        }
    }

    /// Line shown as the bot's presence.
    pub fn presence_text(&self) -> String {
        if self.online {
            format!("Server Online | Players {}/{}", self.players, self.max_players)
        } else {
            OFFLINE_NAME.to_string()
        }
    }
}
