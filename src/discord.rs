// src/discord.rs
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use crate::config::Config;
use crate::models::status::{StatusRecord, UNKNOWN};

const API_BASE: &str = "https://discord.com/api/v10";
const COLOR_ONLINE: u32 = 0x00a86b;
const COLOR_OFFLINE: u32 = 0xcc3333;
const BAR_SEGMENTS: usize = 10;

#[derive(Debug)]
pub enum PublishError {
    Request(reqwest::Error),
    Rejected(StatusCode),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "Discord request failed: {}", e),
            Self::Rejected(status) => write!(f, "Discord rejected the request: {}", status),
        }
    }
}

impl std::error::Error for PublishError {}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

#[derive(Deserialize)]
struct CreatedMessage {
    id: String,
}

/// Keeps one channel message in sync with the latest status.
#[derive(Debug)]
pub struct StatusPublisher {
    client: Client,
    api_base: String,
    token: String,
    channel_id: String,
    timeout: Duration,
    // Held for the whole edit-or-create sequence so concurrent cycles cannot both post.
    message_id: Mutex<Option<String>>,
}

impl StatusPublisher {
    pub fn new(
        token: String,
        channel_id: String,
        message_id: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self::with_api_base(API_BASE, token, channel_id, message_id, timeout)
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        token: String,
        channel_id: String,
        message_id: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            token,
            channel_id,
            timeout,
            message_id: Mutex::new(message_id),
        }
    }

    /// `None` unless both the bot token and the status channel are configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        match (&config.discord_token, &config.status_channel_id) {
            (Some(token), Some(channel)) => Some(Self::new(
                token.clone(),
                channel.clone(),
                config.status_message_id.clone(),
                config.discord_timeout(),
            )),
            _ => None,
        }
    }

    pub async fn message_id(&self) -> Option<String> {
        self.message_id.lock().await.clone()
    }

    /// Edits the tracked message, or posts a new one when there is none to edit.
    pub async fn publish(&self, record: &StatusRecord) -> Result<(), PublishError> {
        let body = json!({ "content": "", "embeds": [build_embed(record, unix_now())] });
        let mut message_id = self.message_id.lock().await;

        if let Some(id) = message_id.as_deref() {
            let url = format!("{}/channels/{}/messages/{}", self.api_base, self.channel_id, id);
            let response = self
                .client
                .patch(&url)
                .timeout(self.timeout)
                .header("Authorization", format!("Bot {}", self.token))
                .json(&body)
                .send()
                .await?;
            if response.status().is_success() {
                return Ok(());
            }
            warn!("Could not edit status message {} ({}), posting a new one", id, response.status());
        }

        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PublishError::Rejected(response.status()));
        }

        let created = response.json::<CreatedMessage>().await?;
        info!("Created status message. Set STATUS_MESSAGE_ID to: {}", created.id);
        *message_id = Some(created.id);
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Renders the status embed. `now` is a unix timestamp, shown through Discord's own
/// timestamp markup so readers see their local time.
pub fn build_embed(record: &StatusRecord, now: u64) -> Value {
    let status_line = if record.online { "🟢 Online" } else { "🔴 Offline" };
    let reason = match (&record.reason, record.online) {
        (Some(reason), false) => format!(" ({})", reason),
        _ => String::new(),
    };

    let mut fields = vec![
        json!({
            "name": ":bust_in_silhouette: Players",
            "value": format!(
                "{}/{}\n{} ({:.1}%)",
                record.players,
                record.max_players,
                capacity_bar(record.capacity_pct),
                record.capacity_pct
            ),
            "inline": true
        }),
        json!({
            "name": ":map: Map",
            "value": format!(
                "{}\nVersion: {}",
                record.map,
                record.version.as_deref().unwrap_or(UNKNOWN)
            ),
            "inline": true
        }),
    ];

    if let Some(uptime) = record.uptime_seconds.filter(|secs| *secs > 0) {
        fields.push(json!({ "name": "Uptime", "value": format_uptime(uptime), "inline": true }));
    }
    if let Some(load) = record.cpu_avg_load {
        let hz = record
            .cpu_avg_hz
            .map(|hz| format!("\n{} MHz", hz))
            .unwrap_or_default();
        fields.push(json!({ "name": "CPU", "value": format!("{:.1}%{}", load, hz), "inline": true }));
    }
    if let Some(ping) = record.shell_ping_ms.or(record.tcp_ping_ms).filter(|_| record.online) {
        fields.push(json!({ "name": ":ping_pong: Ping", "value": format!("{:.0} ms", ping), "inline": true }));
    }

    let color = if record.online { COLOR_ONLINE } else { COLOR_OFFLINE };
    json!({
        "color": color,
        "title": format!("**{}**", record.name),
        "description": format!(
            "**Status:** {}{}\n**Last Check:** <t:{}:T>\n\u{200B}",
            status_line, reason, now
        ),
        "fields": fields,
        "footer": { "text": "Updated" },
    })
}

/// Ten-segment bar for a percentage in `[0, 100]`.
pub fn capacity_bar(pct: f64) -> String {
    let filled = ((pct / 100.0) * BAR_SEGMENTS as f64).round().clamp(0.0, BAR_SEGMENTS as f64) as usize;
    format!("{}{}", "▰".repeat(filled), "▱".repeat(BAR_SEGMENTS - filled))
}

pub fn format_uptime(secs: u64) -> String {
    format!("{}d {}h {}m", secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60)
}
