//! Per-client rate limiting.
//!
//! One bucket per client key (`X-Forwarded-For`, or the loopback literal
//! when absent): a counter and a window deadline. Buckets reset lazily on
//! the first request after their deadline; stale buckets are pruned when
//! the map grows past a threshold.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Requests admitted per key per window.
pub const MAX_REQUESTS_PER_WINDOW: u32 = 10;

/// Window length.
pub const WINDOW: Duration = Duration::from_millis(60_000);

/// Map size at which expired buckets are swept.
const PRUNE_THRESHOLD: usize = 256;

#[derive(Debug)]
struct RateCell {
    count: u32,
    window_ends_at: Instant,
}

/// Thread-safe fixed-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    cells: Mutex<HashMap<String, RateCell>>,
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(MAX_REQUESTS_PER_WINDOW, WINDOW)
    }

    /// Custom limits (tests).
    #[must_use]
    pub fn with_limits(max_requests: u32, window: Duration) -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Admit or reject one request for the key.
    pub fn try_admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut cells = self.cells.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if cells.len() > PRUNE_THRESHOLD {
            cells.retain(|_, cell| now < cell.window_ends_at);
        }

        let cell = cells.entry(key.to_string()).or_insert(RateCell {
            count: 0,
            window_ends_at: now + self.window,
        });

        if now >= cell.window_ends_at {
            cell.count = 0;
            cell.window_ends_at = now + self.window;
        }

        if cell.count >= self.max_requests {
            return false;
        }
        cell.count += 1;
        true
    }
}
