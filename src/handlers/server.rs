// src/handlers/server.rs
use actix_web::{web, HttpRequest, HttpResponse};
use governor::{RateLimiter, clock::DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use log::{debug, error};
use serde::Deserialize;
use std::net::IpAddr;
use crate::refresh::Refresher;
use crate::utils::{extract_peer_ip, RequestError};

pub type QueryRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    refresh: bool,
}

/// Latest status as JSON. Runs an out-of-band cycle when nothing is cached yet or the caller
/// asks for `?refresh=true`.
pub async fn get_status(
    req: HttpRequest,
    query: web::Query<StatusQuery>,
    refresher: web::Data<Refresher>,
    rate_limiter: web::Data<QueryRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = extract_peer_ip(&req)?;

    if rate_limiter.check_key(&peer_ip).is_err() {
        error!("Rate limit exceeded for status query from ip: {}", peer_ip);
        return Err(RequestError::RateLimitExceeded);
    }

    let record = match refresher.cache().get() {
        Some(record) if !query.refresh => record,
        _ => {
            debug!("Running on-demand refresh for {}", peer_ip);
            refresher.refresh_once().await
        }
    };

    Ok(HttpResponse::Ok().json(record.as_ref()))
}
