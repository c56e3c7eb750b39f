//! Per-client request throttling.
//!
//! A fixed-window counter keyed by client address. It runs as middleware in
//! front of the identity gate, so throttled requests never reach token checks.

use crate::config::RateLimitConfig;
use crate::errors::ServiceError;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RequestThrottle {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RequestThrottle {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_seconds.max(1)),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records one request for `key` and decides whether it may proceed.
    pub fn check(&self, key: &str) -> ThrottleDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> ThrottleDecision {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Drop stale windows so the map does not grow with every address seen.
        if windows.len() > 10_000 {
            let window = self.window;
            windows.retain(|_, entry| now.duration_since(entry.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let retry_after = self.window.saturating_sub(now.duration_since(entry.started));
            return ThrottleDecision::Limited { retry_after };
        }

        entry.count += 1;
        ThrottleDecision::Allowed
    }
}

/// Resolves the throttle key for a request: the peer address when known,
/// otherwise the first `X-Forwarded-For` hop.
pub fn client_key(peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(peer) = peer {
        return peer.ip().to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Middleware rejecting requests over the configured per-client rate.
pub async fn throttle(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(peer, request.headers());

    match state.throttle.check(&key) {
        ThrottleDecision::Allowed => Ok(next.run(request).await),
        ThrottleDecision::Limited { retry_after } => {
            tracing::warn!("Rate limit exceeded for {} on {}", key, request.uri().path());
            Err(ServiceError::TooManyRequests {
                retry_after_seconds: retry_after.as_secs().max(1),
            })
        }
    }
}
