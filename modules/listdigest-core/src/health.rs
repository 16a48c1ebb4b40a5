//! Short-lived cache for health checks, owned by whoever polls them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Outcome of a cheap liveness check, shown as-is on a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub active: bool,
    pub message: String,
}

impl Status {
    pub fn active(message: impl Into<String>) -> Self {
        Self {
            active: true,
            message: message.into(),
        }
    }

    pub fn inactive(message: impl Into<String>) -> Self {
        Self {
            active: false,
            message: message.into(),
        }
    }
}

/// Values whose freshness depends on whether they report success.
pub trait Healthy {
    fn is_healthy(&self) -> bool;
}

impl Healthy for Status {
    fn is_healthy(&self) -> bool {
        self.active
    }
}

pub const HEALTHY_TTL: Duration = Duration::from_secs(30);
pub const UNHEALTHY_TTL: Duration = Duration::from_secs(5);

/// Healthy results are kept longer than failures so recovery shows up quickly.
pub struct HealthCache<T> {
    healthy_ttl: Duration,
    unhealthy_ttl: Duration,
    entries: Mutex<HashMap<String, (T, Instant)>>,
}

impl<T: Healthy + Clone> Default for HealthCache<T> {
    fn default() -> Self {
        Self::with_ttls(HEALTHY_TTL, UNHEALTHY_TTL)
    }
}

impl<T: Healthy + Clone> HealthCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttls(healthy_ttl: Duration, unhealthy_ttl: Duration) -> Self {
        Self {
            healthy_ttl,
            unhealthy_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh cached value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.lock();
        let (value, stored_at) = entries.get(key)?;
        let ttl = if value.is_healthy() {
            self.healthy_ttl
        } else {
            self.unhealthy_ttl
        };
        (stored_at.elapsed() <= ttl).then(|| value.clone())
    }

    pub fn insert(&self, key: &str, value: T) {
        self.lock().insert(key.to_string(), (value, Instant::now()));
    }

    /// Force the next lookup for `key` to re-check, e.g. after settings change.
    pub fn invalidate(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Cached value, or the result of `check` which is then stored.
    pub async fn get_or_check<F, Fut>(&self, key: &str, check: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = check().await;
        self.insert(key, value.clone());
        value
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (T, Instant)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
