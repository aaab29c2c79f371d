//! Per-caller request rate limiting.
//!
//! The HTTP layer owns rate limiting; registry operations never see it. The
//! limiter is injected into the router as an `Arc<dyn RateLimiter>` so tests
//! and embedders can swap in their own policy.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::error::AppError;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Key used for callers whose address is unknown.
pub const UNKNOWN_CALLER: &str = "unknown";

/// Tracked callers above which expired windows are pruned.
const PRUNE_THRESHOLD: usize = 4096;

/// Decides whether a caller may make another request.
pub trait RateLimiter: Send + Sync {
    /// Record one request from `caller` and report whether it is allowed.
    fn check(&self, caller: &str) -> bool;
}

/// Allows every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn check(&self, _caller: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter: at most `max_requests` per caller in each window.
///
/// A caller's window starts with its first request and resets once `window`
/// has elapsed.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    callers: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            callers: Mutex::new(HashMap::new()),
        }
    }

    fn check_at(&self, caller: &str, now: Instant) -> bool {
        // A poisoned map only holds counters; keep limiting with it.
        let mut callers = self
            .callers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if callers.len() > PRUNE_THRESHOLD {
            let window = self.window;
            callers.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = callers.entry(caller.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, caller: &str) -> bool {
        self.check_at(caller, Instant::now())
    }
}

/// Build the limiter described by the configuration.
pub fn from_config(config: &RateLimitConfig) -> Arc<dyn RateLimiter> {
    if config.enabled {
        Arc::new(FixedWindowLimiter::new(
            config.requests_per_window,
            Duration::from_secs(config.window_secs),
        ))
    } else {
        Arc::new(Unlimited)
    }
}

/// Middleware rejecting callers that exceed the injected limiter.
///
/// Callers are identified by peer IP, which requires the server to be run
/// with connect info. Without it every request shares one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<dyn RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string());

    if !limiter.check(&caller) {
        warn!(caller = %caller, path = %req.uri().path(), "Rate limit exceeded");
        return Err(AppError::RateLimited(RATE_LIMITED_MESSAGE.to_string()));
    }

    Ok(next.run(req).await)
}
