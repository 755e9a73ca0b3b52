//! Rate limiting middleware for the webhook endpoints.
//!
//! Fixed-window counter held in process memory. It resets on restart and is
//! deliberately not a correctness mechanism, only coarse abuse mitigation.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter state tracking requests per client key
#[derive(Clone)]
pub struct RateLimiter {
    /// Maximum requests per minute
    max_requests: u32,
    /// Request tracking: key -> (count, window_start)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
}

/// Outcome of one rate check, with everything needed for response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            max_requests: requests_per_minute,
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if a request is allowed for the given client key
    pub async fn check(&self, key: &str) -> RateDecision {
        let mut requests = self.requests.write().await;
        let now = Instant::now();

        let entry = requests.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) > WINDOW {
            // Window expired, reset
            *entry = (0, now);
        }

        let reset_secs = WINDOW
            .saturating_sub(now.duration_since(entry.1))
            .as_secs()
            .max(1);

        if entry.0 < self.max_requests {
            entry.0 += 1;
            RateDecision {
                allowed: true,
                limit: self.max_requests,
                remaining: self.max_requests - entry.0,
                reset_secs,
            }
        } else {
            RateDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_secs,
            }
        }
    }

    /// Clean up expired entries (call periodically)
    pub async fn cleanup_expired(&self) {
        let mut requests = self.requests.write().await;
        let now = Instant::now();

        requests.retain(|_, (_, start)| now.duration_since(*start) <= WINDOW);
    }
}

/// Client key: forwarded IP when present, otherwise a hash of the user agent.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded_ip = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    if let Some(ip) = forwarded_ip {
        return ip.to_string();
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    let digest = Sha256::digest(user_agent.as_bytes());
    format!("ua:{}", hex::encode(&digest[..8]))
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(request.headers());
    let decision = limiter.check(&key).await;

    if decision.allowed {
        let mut response = next.run(request).await;
        apply_headers(response.headers_mut(), &decision);
        response
    } else {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        )
            .into_response();
        apply_headers(response.headers_mut(), &decision);
        if let Ok(value) = HeaderValue::from_str(&decision.reset_secs.to_string()) {
            response.headers_mut().insert("retry-after", value);
        }
        response
    }
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    let pairs = [
        ("x-ratelimit-limit", decision.limit.to_string()),
        ("x-ratelimit-remaining", decision.remaining.to_string()),
        ("x-ratelimit-reset", decision.reset_secs.to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
