//! Handle → numeric user id cache, persisted as a flat JSON object.
//!
//! An absent or corrupt file loads as empty. Entries are never invalidated.
//! Concurrent fetches share one instance. Each insert rewrites the whole file;
//! writes are serialized and always carry the latest entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use listdigest_common::DigestError;
use tracing::{debug, warn};

use crate::error::classify_x_error;
use crate::traits::ListSource;

pub const CACHE_FILE: &str = "user_ids.json";

pub struct IdentifierCache {
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, String>>,
    writer: tokio::sync::Mutex<()>,
}

impl IdentifierCache {
    /// Load `<dir>/user_ids.json`.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(CACHE_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Identifier cache unreadable, starting empty"
                );
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        debug!(path = %path.display(), entries = entries.len(), "Loaded identifier cache");
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Cache that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(HashMap::new()),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Lowercase, trimmed, without a leading `@`.
    pub fn normalize(handle: &str) -> String {
        handle.trim().trim_start_matches('@').trim().to_lowercase()
    }

    pub fn get(&self, handle: &str) -> Option<String> {
        self.lock().get(&Self::normalize(handle)).cloned()
    }

    pub async fn insert(&self, handle: &str, id: &str) {
        self.lock().insert(Self::normalize(handle), id.to_string());
        self.persist().await;
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached id for `handle`, or one resolution call whose result is stored.
    pub async fn resolve(
        &self,
        source: &dyn ListSource,
        handle: &str,
    ) -> Result<String, DigestError> {
        if let Some(id) = self.get(handle) {
            return Ok(id);
        }
        let normalized = Self::normalize(handle);
        let user = source
            .user_by_handle(&normalized)
            .await
            .map_err(|e| classify_x_error(&e, &format!("user @{normalized}")))?;
        if user.id.is_empty() {
            return Err(DigestError::Transient(format!(
                "user @{normalized} resolved without an id"
            )));
        }
        self.insert(&normalized, &user.id).await;
        Ok(user.id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn persist(&self) {
        let Some(ref path) = self.path else {
            return;
        };
        let _writer = self.writer.lock().await;
        let snapshot = self.lock().clone();
        if let Err(e) = write_entries(path, &snapshot).await {
            warn!(path = %path.display(), error = %e, "Failed to persist identifier cache");
        }
    }
}

async fn write_entries(path: &Path, entries: &HashMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_string(entries)?;
    tokio::fs::write(path, body).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IdentifierCache::load(dir.path().join("nested"));
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CACHE_FILE), "{not json").unwrap();
        assert!(IdentifierCache::load(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn inserts_persist_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IdentifierCache::load(dir.path().join("cache"));
        cache.insert("@Ferris", "42").await;

        let reloaded = IdentifierCache::load(dir.path().join("cache"));
        assert_eq!(reloaded.get("ferris").as_deref(), Some("42"));
        assert_eq!(reloaded.get(" @FERRIS ").as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn concurrent_inserts_all_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IdentifierCache::load(dir.path());
        let handles: Vec<String> = (0..8).map(|i| format!("user{i}")).collect();
        futures::future::join_all(handles.iter().map(|h| cache.insert(h, h))).await;

        let reloaded = IdentifierCache::load(dir.path());
        assert_eq!(reloaded.len(), 8);
        assert_eq!(reloaded.get("user7").as_deref(), Some("user7"));
    }

    #[tokio::test]
    async fn in_memory_cache_writes_nothing() {
        let cache = IdentifierCache::in_memory();
        cache.insert("a", "1").await;
        assert_eq!(cache.len(), 1);
    }
}
