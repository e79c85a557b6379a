//! Fixed-window request throttling keyed by client address.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rivet_http::protocol::{Request, Response};
use serde_json::json;

use crate::error::HandlerError;
use crate::pipeline::Middleware;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Requests admitted per window and client.
    pub max_requests: u32,
    /// Body of the 429 response.
    pub message: String,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 100,
            message: "Too many requests, please try again later".to_owned(),
        }
    }
}

struct Window {
    count: u32,
    reset_at: Instant,
    reset_unix: u64,
}

struct State {
    windows: HashMap<IpAddr, Window>,
    last_sweep: Instant,
}

/// One limiter instance owns one window map shared by every request it
/// sees; expired entries are swept at most once per window. The runtime is
/// multi-threaded, so the map sits behind a mutex held only for the map
/// operations themselves.
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self { config, state: Mutex::new(State { windows: HashMap::new(), last_sweep: Instant::now() }) }
    }

    fn window(&self) -> Duration {
        Duration::from_millis(self.config.window_ms)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[async_trait]
impl Middleware for RateLimiter {
    async fn handle(&self, request: &mut Request, response: &mut Response) -> Result<(), HandlerError> {
        let ip = match request.remote_addr() {
            Some(addr) => addr.ip(),
            // nothing to key on
            None => return Ok(()),
        };

        let window = self.window();
        let now = Instant::now();

        let (count, reset_unix, retry_after) = {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            if now.duration_since(state.last_sweep) >= window {
                state.windows.retain(|_, entry| entry.reset_at > now);
                state.last_sweep = now;
            }

            let entry = state.windows.entry(ip).or_insert_with(|| new_window(now, window));
            if entry.reset_at <= now {
                *entry = new_window(now, window);
            }
            entry.count += 1;
            (entry.count, entry.reset_unix, entry.reset_at.saturating_duration_since(now).as_secs())
        };

        let limit = self.config.max_requests;
        response
            .set_header("x-ratelimit-limit", limit.to_string())
            .set_header("x-ratelimit-remaining", limit.saturating_sub(count).to_string())
            .set_header("x-ratelimit-reset", reset_unix.to_string());

        if count > limit {
            response.set_header("retry-after", retry_after.to_string());
            response.status(429).json(&json!({ "error": self.config.message }));
        }
        Ok(())
    }
}

fn new_window(now: Instant, window: Duration) -> Window {
    let reset_unix = SystemTime::now()
        .checked_add(window)
        .and_then(|reset| reset.duration_since(UNIX_EPOCH).ok())
        .map(|since_epoch| since_epoch.as_secs())
        .unwrap_or_default();
    Window { count: 0, reset_at: now + window, reset_unix }
}
