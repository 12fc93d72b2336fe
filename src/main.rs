// src/main.rs
mod config;
mod discord;
mod handlers;
mod models;
mod refresh;
mod stats;
mod storage;
mod utils;

use actix_web::{ web, App, HttpServer };
use env_logger::Env;
use governor::RateLimiter;
use std::sync::Arc;
use crate::config::Config;
use crate::discord::StatusPublisher;
use crate::handlers::server::QueryRateLimiter;
use crate::refresh::Refresher;
use crate::stats::StatsService;
use crate::storage::memory::StatusCache;
use log::{info, warn};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    if config.target_host.is_none() {
        warn!("SERVER_HOST is empty; every refresh will report the server offline");
    }

    let publisher = StatusPublisher::from_config(&config);
    match &publisher {
        Some(_) if config.status_message_id.is_none() => {
            info!("STATUS_MESSAGE_ID not set; a new status message will be created")
        }
        Some(_) => {}
        None => info!("DISCORD_TOKEN or STATUS_CHANNEL_ID not set; status message updates disabled"),
    }

    let cache = Arc::new(StatusCache::new());
    let refresher = web::Data::new(Refresher::new(
        StatsService::from_config(&config),
        cache,
        publisher,
    ));

    info!("Refreshing server status every {}s", config.refresh_secs);
    tokio::spawn(refresher.clone().into_inner().run(config.refresh_interval()));

    // Get bind address and port from environment or use defaults
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind = format!("{}:{}", bind_address, port);

    let query_rate_limiter: web::Data<QueryRateLimiter> =
        web::Data::new(RateLimiter::keyed(config.query_quota()));

    info!("Starting status query server on {}", bind);
    HttpServer::new(move || {
        App::new()
            .app_data(refresher.clone())
            .app_data(query_rate_limiter.clone())
            .route("/", web::get().to(handlers::index::index))
            .route("/server", web::get().to(handlers::server::get_status))
    })
        .bind(&bind)?
        .run().await
}
