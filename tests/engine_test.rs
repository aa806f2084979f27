use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration as StdDuration,
};

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use vigil_core::{
    config::DetectionPolicy,
    core::{
        cache::{CacheEntry, ChangeCache},
        engine::DetectionEngine,
    },
    error::DetectError,
    git::{
        remote::{RemoteComparison, RemoteProbe},
        repo::{CommitId, RepoHandle},
    },
    logging::Logger,
};

/// Probe over in-memory tips, with a fetch counter so tests can assert
/// exactly how often the network would have been touched.
#[derive(Default)]
struct FakeProbe {
    fetches: AtomicUsize,
    fetch_fails: AtomicBool,
    local_fails: AtomicBool,
    local_tips: Mutex<HashMap<String, CommitId>>,
    remote_tips: Mutex<HashMap<String, CommitId>>,
    fetch_delays_ms: Mutex<HashMap<String, u64>>,
}

impl FakeProbe {
    fn set_local(&self, repo: &RepoHandle, tip: &str) {
        self.local_tips
            .lock()
            .unwrap()
            .insert(repo.id.clone(), CommitId::new(tip));
    }

    fn set_remote(&self, repo: &RepoHandle, tip: &str) {
        self.remote_tips
            .lock()
            .unwrap()
            .insert(repo.id.clone(), CommitId::new(tip));
    }

    fn set_fetch_delay(&self, repo: &RepoHandle, ms: u64) {
        self.fetch_delays_ms
            .lock()
            .unwrap()
            .insert(repo.id.clone(), ms);
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RemoteProbe for FakeProbe {
    fn fetch_and_compare(&self, handle: &RepoHandle) -> Result<RemoteComparison, DetectError> {
        let delay = self
            .fetch_delays_ms
            .lock()
            .unwrap()
            .get(&handle.id)
            .copied()
            .unwrap_or(0);
        if delay > 0 {
            std::thread::sleep(StdDuration::from_millis(delay));
        }

        if self.fetch_fails.load(Ordering::SeqCst) {
            return Err(DetectError::vcs(
                &handle.name,
                git2::Error::from_str("simulated network failure"),
            ));
        }

        self.fetches.fetch_add(1, Ordering::SeqCst);

        let remote = self
            .remote_tips
            .lock()
            .unwrap()
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| {
                DetectError::vcs(&handle.name, git2::Error::from_str("no remote tip"))
            })?;
        let local = self.resolve_local_tip(handle)?;

        Ok(RemoteComparison {
            has_changes: local != remote,
            remote_commit_id: remote,
        })
    }

    fn resolve_local_tip(&self, handle: &RepoHandle) -> Result<CommitId, DetectError> {
        if self.local_fails.load(Ordering::SeqCst) {
            return Err(DetectError::vcs(
                &handle.name,
                git2::Error::from_str("simulated local read failure"),
            ));
        }
        self.local_tips
            .lock()
            .unwrap()
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| DetectError::vcs(&handle.name, git2::Error::from_str("no local tip")))
    }
}

fn build_handle(id: &str) -> RepoHandle {
    RepoHandle {
        id: id.to_string(),
        name: format!("repo-{id}"),
        path: format!("/tmp/{id}"),
        branch: "main".to_string(),
        remote: "git@github.com:roshin/vigil.git".to_string(),
    }
}

fn build_engine() -> (DetectionEngine<Arc<FakeProbe>>, Arc<FakeProbe>) {
    let probe = Arc::new(FakeProbe::default());
    let engine = DetectionEngine::new(ChangeCache::new(), Arc::clone(&probe), Logger::placeholder());
    (engine, probe)
}

fn policy(cache_enabled: bool, cooldown_minutes: i64) -> DetectionPolicy {
    DetectionPolicy {
        cache_enabled,
        cooldown_minutes,
    }
}

#[tokio::test]
async fn test_second_check_within_cooldown_skips_fetch() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    probe.set_local(&repo, "aaa");
    probe.set_remote(&repo, "aaa");

    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let p = policy(true, 5);

    assert!(!engine.check_at(&repo, &p, t0).await?);
    assert_eq!(probe.fetch_count(), 1);

    // one minute later: cached remote id is trusted, no network
    let t1 = t0 + Duration::minutes(1);
    assert!(!engine.check_at(&repo, &p, t1).await?);
    assert_eq!(probe.fetch_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cache_disabled_always_fetches() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    probe.set_local(&repo, "aaa");
    probe.set_remote(&repo, "aaa");

    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let p = policy(false, 5);

    for i in 1..=3 {
        engine.check_at(&repo, &p, t0).await?;
        assert_eq!(probe.fetch_count(), i);
    }
    Ok(())
}

#[tokio::test]
async fn test_cache_written_even_when_disabled() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    probe.set_local(&repo, "aaa");
    probe.set_remote(&repo, "aaa");

    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    engine.check_at(&repo, &policy(false, 5), t0).await?;
    assert_eq!(probe.fetch_count(), 1);
    assert_eq!(engine.cache().len().await, 1);

    // enabling caching right after must reuse the warmed entry
    let t1 = t0 + Duration::minutes(1);
    engine.check_at(&repo, &policy(true, 5), t1).await?;
    assert_eq!(probe.fetch_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_divergence_comparison() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let p = policy(false, 0);

    probe.set_local(&repo, "aaa");
    probe.set_remote(&repo, "aaa");
    assert!(!engine.check_at(&repo, &p, t0).await?);

    probe.set_remote(&repo, "bbb");
    assert!(engine.check_at(&repo, &p, t0).await?);
    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_is_fail_safe() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    probe.set_local(&repo, "aaa");
    probe.set_remote(&repo, "bbb");

    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let p = policy(false, 0);

    // seed the cache with one good result
    assert!(engine.check_at(&repo, &p, t0).await?);
    let seeded = engine.cache().get(&repo.id).await.unwrap();

    probe.fetch_fails.store(true, Ordering::SeqCst);

    // check() surfaces the error, check_one() degrades to "no change"
    let t1 = t0 + Duration::minutes(1);
    assert!(engine.check_at(&repo, &p, t1).await.is_err());
    assert!(!engine.check_one(&repo, &p).await);

    // cache untouched by the failed attempts
    assert_eq!(engine.cache().len().await, 1);
    assert_eq!(engine.cache().get(&repo.id).await.unwrap(), seeded);
    Ok(())
}

#[tokio::test]
async fn test_local_failure_on_cache_hit_is_terminal() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    probe.set_local(&repo, "aaa");
    probe.set_remote(&repo, "aaa");

    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let p = policy(true, 5);

    engine.check_at(&repo, &p, t0).await?;
    assert_eq!(probe.fetch_count(), 1);

    probe.local_fails.store(true, Ordering::SeqCst);

    // fresh entry + broken local read: error out, never fall back to a
    // fetch
    let t1 = t0 + Duration::minutes(1);
    assert!(engine.check_at(&repo, &p, t1).await.is_err());
    assert_eq!(probe.fetch_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_cache_entry_forces_fetch() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    probe.set_local(&repo, "aaa");
    probe.set_remote(&repo, "aaa");

    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    engine
        .cache()
        .put(
            &repo.id,
            CacheEntry {
                last_checked_at: t0,
                remote_commit_id: CommitId::new(""),
            },
        )
        .await;

    // entry is fresh but structurally invalid: treated as absent
    assert!(!engine.check_at(&repo, &policy(true, 5), t0).await?);
    assert_eq!(probe.fetch_count(), 1);

    let repaired = engine.cache().get(&repo.id).await.unwrap();
    assert_eq!(repaired.remote_commit_id, CommitId::new("aaa"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_repos_do_not_block_each_other() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let engine = Arc::new(engine);
    let r1 = build_handle("r1");
    let r2 = build_handle("r2");
    probe.set_local(&r1, "aaa");
    probe.set_remote(&r1, "aaa");
    probe.set_local(&r2, "ccc");
    probe.set_remote(&r2, "ddd");
    probe.set_fetch_delay(&r1, 500);

    let p = policy(true, 5);
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let slow = {
        let engine = Arc::clone(&engine);
        let r1 = r1.clone();
        let p = p.clone();
        tokio::task::spawn_blocking(move || {
            tokio::runtime::Handle::current().block_on(engine.check_at(&r1, &p, t0))
        })
    };

    let started = std::time::Instant::now();
    let r2_changed = engine.check_at(&r2, &p, t0).await?;
    let elapsed = started.elapsed();

    assert!(r2_changed);
    assert!(
        elapsed < StdDuration::from_millis(400),
        "r2 check waited on r1's fetch ({elapsed:?})"
    );

    let r1_changed = slow.await??;
    assert!(!r1_changed);

    // entries stayed isolated per repository
    let e1 = engine.cache().get(&r1.id).await.unwrap();
    let e2 = engine.cache().get(&r2.id).await.unwrap();
    assert_eq!(e1.remote_commit_id, CommitId::new("aaa"));
    assert_eq!(e2.remote_commit_id, CommitId::new("ddd"));
    Ok(())
}

#[tokio::test]
async fn test_check_all_returns_flagged_subset() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let r1 = build_handle("r1");
    let r2 = build_handle("r2");
    let r3 = build_handle("r3");
    probe.set_local(&r1, "aaa");
    probe.set_remote(&r1, "aaa");
    probe.set_local(&r2, "bbb");
    probe.set_remote(&r2, "ccc");
    // r3 has no tips configured: the probe fails, fail-safe says "no
    // change"

    let flagged = engine
        .check_all(&[r1, r2.clone(), r3], &policy(false, 0))
        .await;
    assert_eq!(flagged, vec![r2]);
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_cooldown_scenario() -> anyhow::Result<()> {
    let (engine, probe) = build_engine();
    let repo = build_handle("r1");
    let p = policy(true, 5);

    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    // t=0: local C1, remote C1 -> no changes, cache warmed
    probe.set_local(&repo, "c1");
    probe.set_remote(&repo, "c1");
    assert!(!engine.check_at(&repo, &p, t0).await?);
    assert_eq!(probe.fetch_count(), 1);

    // t=1min: local branch advances to C2; cached remote C1 disagrees,
    // detected without any network call
    probe.set_local(&repo, "c2");
    assert!(engine.check_at(&repo, &p, t0 + Duration::minutes(1)).await?);
    assert_eq!(probe.fetch_count(), 1);

    // t=6min: entry is stale, real fetch; remote moved to C2 too
    probe.set_remote(&repo, "c2");
    let t6 = t0 + Duration::minutes(6);
    assert!(!engine.check_at(&repo, &p, t6).await?);
    assert_eq!(probe.fetch_count(), 2);

    let entry = engine.cache().get(&repo.id).await.unwrap();
    assert_eq!(entry.last_checked_at, t6);
    assert_eq!(entry.remote_commit_id, CommitId::new("c2"));
    Ok(())
}
