//! In-memory fixed-window rate limiter.
//!
//! Guards the credential-issuing endpoint against brute-force and quota
//! burn. Per-process only — a multi-instance deployment would need shared
//! counters, which is out of scope along with every other cross-instance
//! concern.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Entry cap before expired windows are swept out.
const PRUNE_THRESHOLD: usize = 1024;

struct Window {
    started_at: Instant,
    count: u32,
}

pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `key` and report whether it is within the limit.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= self.max_requests
    }
}
