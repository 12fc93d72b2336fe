// src/refresh.rs
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use crate::discord::StatusPublisher;
use crate::models::status::StatusRecord;
use crate::stats::StatsService;
use crate::storage::memory::StatusCache;

/// Ties a stats cycle to its consumers: the cache, the status message and the presence line.
pub struct Refresher {
    service: StatsService,
    cache: Arc<StatusCache>,
    publisher: Option<StatusPublisher>,
}

impl Refresher {
    pub fn new(
        service: StatsService,
        cache: Arc<StatusCache>,
        publisher: Option<StatusPublisher>,
    ) -> Self {
        Self { service, cache, publisher }
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// One cycle: fetch, store, publish. Publishing failures are logged and dropped.
    pub async fn refresh_once(&self) -> Arc<StatusRecord> {
        let record = self.cache.set(self.service.fetch_server_stats().await);
        info!("Presence: {}", record.presence_text());

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish(&record).await {
                error!("Error updating status message: {}", e);
            }
        }
        record
    }

    /// Refreshes immediately, then every `period`, forever.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.refresh_once().await;
        }
    }
}
