use chrono::{DateTime, Utc};

use crate::{
    config::DetectionPolicy,
    core::cache::{CacheEntry, ChangeCache},
    error::DetectError,
    git::remote::RemoteProbe,
    git::repo::RepoHandle,
    logging::Logger,
};

/// Decides whether a repository has unseen remote commits, rationing
/// network round-trips through the change cache. The probe is injected
/// so tests can run against a fake with a fetch counter.
pub struct DetectionEngine<P: RemoteProbe> {
    cache: ChangeCache,
    probe: P,
    logger: Logger,
}

impl<P: RemoteProbe> DetectionEngine<P> {
    pub fn new(cache: ChangeCache, probe: P, logger: Logger) -> Self {
        Self {
            cache,
            probe,
            logger,
        }
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    /// One detection attempt for one repository.
    ///
    /// With caching enabled and a fresh entry, only the local tip is
    /// resolved and compared against the cached remote id; a local
    /// resolution failure is terminal, it does not fall through to a
    /// fetch. Otherwise the probe does the real remote comparison, and a
    /// success always refreshes the cache, even when caching is disabled,
    /// so enabling it later takes effect immediately. A failed probe
    /// leaves the cache exactly as it was.
    ///
    /// No retries here; within the cooldown window repeated calls return
    /// the same answer without touching the network.
    pub async fn check_at(
        &self,
        handle: &RepoHandle,
        policy: &DetectionPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, DetectError> {
        if policy.cache_enabled {
            if let Some(entry) = self.cache.get(&handle.id).await {
                if entry.remote_commit_id.is_empty() {
                    // structurally broken entry: treat as absent, fetch
                    let corrupt = DetectError::CacheCorruption {
                        repo: handle.name.clone(),
                    };
                    let _ = self.logger.warning(&corrupt.to_string()).await;
                } else if entry.is_fresh(policy.cooldown(), now) {
                    let local = self.probe.resolve_local_tip(handle)?;
                    return Ok(local != entry.remote_commit_id);
                }
            }
        }

        self.fetch_path(handle, now).await
    }

    pub async fn check(
        &self,
        handle: &RepoHandle,
        policy: &DetectionPolicy,
    ) -> Result<bool, DetectError> {
        self.check_at(handle, policy, Utc::now()).await
    }

    async fn fetch_path(
        &self,
        handle: &RepoHandle,
        now: DateTime<Utc>,
    ) -> Result<bool, DetectError> {
        let comparison = self.probe.fetch_and_compare(handle)?;
        self.cache
            .put(
                &handle.id,
                CacheEntry {
                    last_checked_at: now,
                    remote_commit_id: comparison.remote_commit_id,
                },
            )
            .await;
        Ok(comparison.has_changes)
    }

    /// Startup-scan entry point: returns the subset of `repos` with
    /// remote changes. Failures are logged and counted as "no change"
    /// for this cycle, never surfaced to the user.
    pub async fn check_all(&self, repos: &[RepoHandle], policy: &DetectionPolicy) -> Vec<RepoHandle> {
        let mut flagged = Vec::new();
        for handle in repos {
            if self.check_one(handle, policy).await {
                flagged.push(handle.clone());
            }
        }
        flagged
    }

    /// Lifecycle-event entry point: same fail-safe wrapping as
    /// `check_all`, for a single repository.
    pub async fn check_one(&self, handle: &RepoHandle, policy: &DetectionPolicy) -> bool {
        match self.check(handle, policy).await {
            Ok(has_changes) => has_changes,
            Err(e) => {
                // fail-safe-quiet: an unreachable remote must not alarm
                // anyone, but the failure stays visible in the log
                let _ = self
                    .logger
                    .error(&format!("[{}] check failed: {e}", handle.name))
                    .await;
                false
            }
        }
    }
}
