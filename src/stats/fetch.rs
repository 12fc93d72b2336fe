// src/stats/fetch.rs
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use crate::config::Config;

/// Pulls the two upstream documents. Holds no state between cycles besides the
/// connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    client: Client,
    primary_url: String,
    secondary_url: String,
    primary_timeout: Duration,
    secondary_timeout: Duration,
}

impl UpstreamFetcher {
    pub fn new(
        primary_url: impl Into<String>,
        secondary_url: impl Into<String>,
        primary_timeout: Duration,
        secondary_timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            primary_url: primary_url.into(),
            secondary_url: secondary_url.into(),
            primary_timeout,
            secondary_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.primary_url.clone(),
            config.secondary_url.clone(),
            config.primary_timeout(),
            config.secondary_timeout(),
        )
    }

    /// Body of the primary status page. The deadline covers connect through the last
    /// byte of the body.
    pub async fn fetch_primary(&self) -> Result<String, reqwest::Error> {
        self.client
            .get(&self.primary_url)
            .timeout(self.primary_timeout)
            .send()
            .await?
            .text()
            .await
    }

    /// Parsed performance document, or `None` on any failure.
    pub async fn fetch_secondary(&self) -> Option<Value> {
        let response = self
            .client
            .get(&self.secondary_url)
            .timeout(self.secondary_timeout)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                debug!("Performance data unavailable: {}", e);
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(doc) => Some(doc),
            Err(e) => {
                debug!("Failed to parse performance data: {}", e);
                None
            }
        }
    }
}
