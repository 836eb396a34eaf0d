//! Fixed-window request counting per client address.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Weekly,
    Contact,
}

struct Window {
    count: u32,
    started: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<(Bucket, String), Window>>>,
    limits: Arc<HashMap<Bucket, u32>>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(weekly: u32, contact: u32, window: Duration) -> Self {
        RateLimiter {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limits: Arc::new(HashMap::from([
                (Bucket::Weekly, weekly),
                (Bucket::Contact, contact),
            ])),
            window,
        }
    }

    /// Counts the request and reports whether it is within the limit.
    pub async fn allow(&self, bucket: Bucket, client: &str) -> bool {
        let limit = self.limits.get(&bucket).copied().unwrap_or(u32::MAX);
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let entry = windows
            .entry((bucket, client.to_string()))
            .or_insert(Window {
                count: 0,
                started: now,
            });
        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        entry.count = entry.count.saturating_add(1);
        let allowed = entry.count <= limit;
        if !allowed {
            tracing::debug!(?bucket, client, "rate limit exceeded");
        }
        allowed
    }

    /// Forgets windows that have already expired.
    pub async fn prune(&self) {
        let now = Instant::now();
        let window = self.window;
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.started) < window);
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.windows.lock().await.len()
    }
}
