use dashmap::DashMap;
use std::time::{Duration, Instant};

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);

// Fixed window - tracks requests per client key since `window_start`
#[derive(Clone, Copy, Debug)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u32,
}

/// Dual fixed-window limiter (per second and per minute) keyed by client.
///
/// Each window map is updated through `DashMap::entry`, which holds the
/// key's shard lock for the whole read-check-write. Unrelated keys only
/// contend when they hash to the same shard.
pub struct RateLimiter {
    per_second: DashMap<String, RateWindow>,
    per_minute: DashMap<String, RateWindow>,
    max_per_second: u32,
    max_per_minute: u32,
}

impl RateLimiter {
    pub fn new(max_per_second: u32, max_per_minute: u32) -> Self {
        Self {
            per_second: DashMap::new(),
            per_minute: DashMap::new(),
            max_per_second,
            max_per_minute,
        }
    }

    /// Returns `true` if the request from `client` is admitted.
    ///
    /// Both windows tick on every call, even when the per-second window
    /// already rejected the request.
    pub fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now())
    }

    pub(crate) fn admit_at(&self, client: &str, now: Instant) -> bool {
        let second = tick(&self.per_second, client, SECOND, now);
        let minute = tick(&self.per_minute, client, MINUTE, now);

        if second > self.max_per_second {
            return false;
        }
        minute <= self.max_per_minute
    }

    /// Forgets clients whose windows have been idle for more than twice the
    /// window length. Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let before = self.per_second.len() + self.per_minute.len();
        self.per_second
            .retain(|_, w| now.saturating_duration_since(w.window_start) < SECOND * 2);
        self.per_minute
            .retain(|_, w| now.saturating_duration_since(w.window_start) < MINUTE * 2);
        before.saturating_sub(self.per_second.len() + self.per_minute.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.per_minute.len()
    }
}

// Replace an expired window or bump the live one; returns the post-increment count
fn tick(
    windows: &DashMap<String, RateWindow>,
    client: &str,
    length: Duration,
    now: Instant,
) -> u32 {
    let mut entry = windows.entry(client.to_string()).or_insert(RateWindow {
        window_start: now,
        count: 0,
    });

    if now.saturating_duration_since(entry.window_start) >= length {
        *entry = RateWindow {
            window_start: now,
            count: 1,
        };
    } else {
        entry.count = entry.count.saturating_add(1);
    }

    entry.count
}
