use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::git::repo::CommitId;

/// What we remembered from the last successful remote resolution of one
/// repository.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub last_checked_at: DateTime<Utc>,
    pub remote_commit_id: CommitId,
}

impl CacheEntry {
    /// Entry is fresh while `now - last_checked_at < cooldown`. A zero or
    /// negative cooldown is never fresh, so the default configuration
    /// (cooldown 0) always re-fetches.
    pub fn is_fresh(&self, cooldown: Duration, now: DateTime<Utc>) -> bool {
        if cooldown <= Duration::zero() {
            return false;
        }
        now - self.last_checked_at < cooldown
    }
}

/// Per-repository store of the last known remote tip, keyed by the
/// handle id. Entries appear only after a successful remote resolution
/// and are never deleted; a stale entry just forces the next real fetch.
///
/// All access goes through the interior lock, so concurrent checks of
/// different repositories never corrupt each other's entries. The lock
/// is only held for the map operation itself, never across a network
/// call.
#[derive(Default)]
pub struct ChangeCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, repo_id: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(repo_id).cloned()
    }

    /// Inserts or overwrites the entry for `repo_id`. Last write wins on
    /// a same-repo race, which only affects freshness of later checks.
    pub async fn put(&self, repo_id: &str, entry: CacheEntry) {
        self.entries
            .write()
            .await
            .insert(repo_id.to_string(), entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
