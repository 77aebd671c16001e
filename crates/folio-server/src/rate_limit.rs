//! Per-IP token buckets.
//!
//! Two quotas are in use: a generous one for browsing the site and a tight
//! one for the public submission endpoints (ratings and contact messages),
//! which are the only writes an anonymous visitor can make.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quota {
    /// Tokens regained per second.
    pub rate: f64,
    pub burst: f64,
}

impl Quota {
    pub const BROWSING: Quota = Quota {
        rate: 10.0,
        burst: 30.0,
    };

    /// One submission every 30 seconds, up to 3 in a row.
    pub const SUBMISSIONS: Quota = Quota {
        rate: 1.0 / 30.0,
        burst: 3.0,
    };
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(quota: Quota) -> Self {
        Self {
            tokens: quota.burst,
            last_refill: Instant::now(),
        }
    }

    /// Take one token, or report how long until one is available.
    fn take(&mut self, quota: Quota) -> Result<(), Duration> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * quota.rate).min(quota.burst);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(missing / quota.rate))
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<IpAddr, TokenBucket>>>,
    quota: Quota,
}

impl RateLimiter {
    pub fn new(quota: Quota) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            quota,
        }
    }

    pub async fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(self.quota))
            .take(self.quota)
    }

    /// Drop buckets that have been idle for `max_idle`.
    pub async fn purge_stale(&self, max_idle: Duration) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < max_idle);
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ip) = client_ip(&req) {
        if let Err(wait) = limiter.check(ip).await {
            warn!(ip = %ip, path = %req.uri().path(), "Rate limit exceeded");
            return too_many_requests(wait);
        }
    }

    next.run(req).await
}

fn too_many_requests(wait: Duration) -> Response {
    let secs = wait.as_secs().max(1);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({ "error": "Too many requests" })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip());
    }

    let header_ip = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
}
