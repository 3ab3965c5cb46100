//! The tenant-aware, asynchronously-refreshed compiled-dictionary cache.
//!
//! State machine per tenant entry:
//!
//! ```text
//! Absent -> Refreshing -> Valid -> (invalidate) -> Refreshing -> Valid -> ...
//! ```
//!
//! Guarantees:
//!
//! - At most one (re)build is in flight per tenant; concurrent readers
//!   during a refresh receive the previously published value if one
//!   exists (stale-read-while-refresh), or wait on that specific build's
//!   completion signal if none does.
//! - Generations are monotonic: once generation *N* is published, readers
//!   observe generation >= *N*, never an absent dictionary.
//! - A failed build is surfaced only to callers waiting on that build;
//!   the previously published generation keeps being served to everyone
//!   else, and no automatic retry is scheduled; the next `get` retries.
//! - Rebuilds run on a bounded worker pool; when the pool is exhausted the
//!   build runs on the caller instead of queuing unboundedly.
//! - A rebuild whose source snapshot is older than the latest publication
//!   is discarded, so concurrent writers and refreshes converge on the
//!   newest source.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cm_compiler::CompiledDictionary;
use cm_core::Tenant;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, warn};

use crate::error::RegistryError;

/// Builds a tenant's dictionary from the current model store.
///
/// Returns the store version the build was computed from, so stale
/// results can be discarded.
pub(crate) type DictionaryBuilder =
    Arc<dyn Fn(&Tenant) -> Result<(u64, CompiledDictionary), RegistryError> + Send + Sync>;

/// Default size of the refresh worker pool.
pub const DEFAULT_REFRESH_WORKERS: usize = 4;

#[derive(Debug, Default)]
struct EntryState {
    generation: u64,
    /// Store version the published dictionary was built from.
    source_version: u64,
    published: Option<Arc<CompiledDictionary>>,
    valid: bool,
    refreshing: bool,
    last_error: Option<Arc<RegistryError>>,
    /// Bumped on every build completion, success or failure.
    completions: u64,
}

struct TenantEntry {
    state: Mutex<EntryState>,
    /// Carries the completion counter to waiting readers.
    changed: watch::Sender<u64>,
}

impl TenantEntry {
    fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            state: Mutex::new(EntryState::default()),
            changed,
        }
    }
}

/// Atomic counters describing cache behaviour.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    caller_runs: AtomicU64,
}

impl CacheStats {
    fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            caller_runs: self.caller_runs.load(Ordering::Relaxed),
        }
    }
}

/// A serializable snapshot of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    /// Reads served from a valid published dictionary.
    pub hits: u64,
    /// Reads served stale while a refresh was in flight or pending.
    pub stale_hits: u64,
    /// Reads that found nothing published and had to wait for a build.
    pub misses: u64,
    /// Background rebuilds dispatched to the worker pool.
    pub refreshes: u64,
    /// Rebuilds that completed with an error.
    pub refresh_failures: u64,
    /// Rebuilds run on the caller because the pool was exhausted.
    pub caller_runs: u64,
}

/// The per-tenant compiled-dictionary cache.
pub(crate) struct DictionaryCache {
    entries: DashMap<Tenant, Arc<TenantEntry>>,
    builder: DictionaryBuilder,
    permits: Arc<Semaphore>,
    stats: Arc<CacheStats>,
}

impl DictionaryCache {
    pub(crate) fn new(builder: DictionaryBuilder, refresh_workers: usize) -> Self {
        Self {
            entries: DashMap::new(),
            builder,
            permits: Arc::new(Semaphore::new(refresh_workers.max(1))),
            stats: Arc::new(CacheStats::default()),
        }
    }

    fn entry(&self, tenant: &Tenant) -> Arc<TenantEntry> {
        if let Some(entry) = self.entries.get(tenant) {
            return Arc::clone(&entry);
        }
        Arc::clone(
            &self
                .entries
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(TenantEntry::new())),
        )
    }

    /// Returns the tenant's dictionary, triggering a (re)build when the
    /// entry is absent or invalidated.
    ///
    /// Readers only wait when nothing has ever been published for the
    /// tenant; otherwise the previous generation is served while the
    /// refresh runs in the background.
    pub(crate) async fn get(
        &self,
        tenant: &Tenant,
    ) -> Result<Arc<CompiledDictionary>, Arc<RegistryError>> {
        let entry = self.entry(tenant);

        loop {
            let mut rx = entry.changed.subscribe();
            let waited_completions = *rx.borrow();

            enum Action {
                Serve(Arc<CompiledDictionary>),
                ServeStaleAndRefresh(Arc<CompiledDictionary>),
                BuildAndWait,
                Wait,
                Fail(Arc<RegistryError>),
            }

            let action = {
                let mut guard = entry.state.lock();
                let state = &mut *guard;
                match (&state.published, state.valid, state.refreshing) {
                    (Some(dict), true, _) => {
                        CacheStats::increment(&self.stats.hits);
                        Action::Serve(Arc::clone(dict))
                    }
                    (Some(dict), false, true) => {
                        CacheStats::increment(&self.stats.stale_hits);
                        Action::Serve(Arc::clone(dict))
                    }
                    (Some(dict), false, false) => {
                        state.refreshing = true;
                        CacheStats::increment(&self.stats.stale_hits);
                        Action::ServeStaleAndRefresh(Arc::clone(dict))
                    }
                    (None, _, true) => Action::Wait,
                    (None, _, false) => {
                        // A completion since we subscribed means the build
                        // we were waiting for failed; surface its error.
                        if state.completions > waited_completions {
                            if let Some(error) = &state.last_error {
                                Action::Fail(Arc::clone(error))
                            } else {
                                Action::Wait
                            }
                        } else {
                            state.refreshing = true;
                            CacheStats::increment(&self.stats.misses);
                            Action::BuildAndWait
                        }
                    }
                }
            };

            match action {
                Action::Serve(dict) => return Ok(dict),
                Action::ServeStaleAndRefresh(dict) => {
                    self.dispatch_refresh(tenant, Arc::clone(&entry));
                    return Ok(dict);
                }
                Action::BuildAndWait => {
                    self.dispatch_refresh(tenant, Arc::clone(&entry));
                }
                Action::Wait => {}
                Action::Fail(error) => return Err(error),
            }

            // Wait for the in-flight build to complete, then re-evaluate.
            if rx.changed().await.is_err() {
                // Sender dropped: the entry was torn down; retry fresh.
                continue;
            }

            let state = entry.state.lock();
            if let Some(dict) = &state.published {
                if state.valid {
                    return Ok(Arc::clone(dict));
                }
            } else if state.completions > waited_completions {
                if let Some(error) = &state.last_error {
                    return Err(Arc::clone(error));
                }
            }
            drop(state);
        }
    }

    /// Dispatches a rebuild to the worker pool, or runs it on the caller
    /// when the pool is exhausted.
    ///
    /// The caller must have set `refreshing` under the entry lock.
    fn dispatch_refresh(&self, tenant: &Tenant, entry: Arc<TenantEntry>) {
        let builder = Arc::clone(&self.builder);
        let stats = Arc::clone(&self.stats);
        let tenant = tenant.clone();

        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                CacheStats::increment(&stats.refreshes);
                tokio::task::spawn_blocking(move || {
                    let result = builder(&tenant);
                    complete_refresh(&entry, &tenant, result, &stats);
                    drop(permit);
                });
            }
            Err(_) => {
                // Caller-runs backpressure: the pool is saturated, so the
                // requesting task pays for the rebuild itself.
                CacheStats::increment(&stats.caller_runs);
                let result = builder(&tenant);
                complete_refresh(&entry, &tenant, result, &stats);
            }
        }
    }

    /// Publishes a dictionary built synchronously by a writer.
    ///
    /// Returns the new generation.
    pub(crate) fn publish(
        &self,
        tenant: &Tenant,
        source_version: u64,
        dictionary: CompiledDictionary,
    ) -> u64 {
        let entry = self.entry(tenant);
        let mut state = entry.state.lock();
        state.generation += 1;
        state.source_version = state.source_version.max(source_version);
        state.published = Some(Arc::new(dictionary));
        state.valid = true;
        state.last_error = None;
        state.completions += 1;
        let generation = state.generation;
        let completions = state.completions;
        drop(state);
        let _ = entry.changed.send(completions);
        debug!(tenant = %tenant, generation, "Published dictionary");
        generation
    }

    /// Marks the tenant's entry invalid, forcing the next `get` to
    /// trigger a rebuild. The published value keeps being served in the
    /// meantime.
    pub(crate) fn invalidate(&self, tenant: &Tenant) {
        let entry = self.entry(tenant);
        let mut state = entry.state.lock();
        state.valid = false;
    }

    /// Returns the tenant's current generation, if anything has been
    /// published.
    pub(crate) fn generation(&self, tenant: &Tenant) -> Option<u64> {
        let entry = self.entries.get(tenant)?;
        let state = entry.state.lock();
        state.published.as_ref().map(|_| state.generation)
    }

    pub(crate) fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }
}

/// Applies a completed rebuild to the entry state and wakes waiters.
fn complete_refresh(
    entry: &TenantEntry,
    tenant: &Tenant,
    result: Result<(u64, CompiledDictionary), RegistryError>,
    stats: &CacheStats,
) {
    let mut state = entry.state.lock();
    state.refreshing = false;
    state.completions += 1;
    match result {
        Ok((source_version, dictionary)) => {
            if source_version < state.source_version {
                // Built from an older snapshot than the latest
                // publication; discard so the newest source wins.
                debug!(tenant = %tenant, "Discarded stale rebuild");
            } else {
                state.generation += 1;
                state.source_version = source_version;
                state.published = Some(Arc::new(dictionary));
                state.valid = true;
                state.last_error = None;
            }
        }
        Err(error) => {
            CacheStats::increment(&stats.refresh_failures);
            warn!(tenant = %tenant, error = %error, "Dictionary rebuild failed");
            state.last_error = Some(Arc::new(error));
        }
    }
    let completions = state.completions;
    drop(state);
    let _ = entry.changed.send(completions);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cm_compiler::CompileError;

    use super::*;

    fn counting_builder(
        calls: Arc<AtomicU64>,
        delay: Duration,
        fail: bool,
    ) -> DictionaryBuilder {
        Arc::new(move |_tenant| {
            calls.fetch_add(1, Ordering::SeqCst);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            if fail {
                Err(RegistryError::Compile(CompileError::UnresolvedParent {
                    class: "ex:doc".to_owned(),
                    parent: "ex:missing".to_owned(),
                }))
            } else {
                Ok((1, CompiledDictionary::new()))
            }
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_first_get_builds_once() {
        let calls = Arc::new(AtomicU64::new(0));
        let cache = DictionaryCache::new(
            counting_builder(Arc::clone(&calls), Duration::ZERO, false),
            2,
        );
        let tenant = Tenant::default();

        let dict = cache.get(&tenant).await.unwrap();
        assert_eq!(dict.model_count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second read is a pure hit.
        cache.get(&tenant).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.generation(&tenant), Some(1));

        let stats = cache.stats().snapshot();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_gets_share_one_build() {
        let calls = Arc::new(AtomicU64::new(0));
        let cache = Arc::new(DictionaryCache::new(
            counting_builder(Arc::clone(&calls), Duration::from_millis(100), false),
            2,
        ));
        let tenant = Tenant::default();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let tenant = tenant.clone();
            handles.push(tokio::spawn(async move { cache.get(&tenant).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        // Every reader saw the single in-flight build.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_read_while_refresh() {
        let calls = Arc::new(AtomicU64::new(0));
        let cache = DictionaryCache::new(
            counting_builder(Arc::clone(&calls), Duration::from_millis(150), false),
            2,
        );
        let tenant = Tenant::default();

        // Publish generation 1 synchronously, then invalidate.
        cache.publish(&tenant, 1, CompiledDictionary::new());
        cache.invalidate(&tenant);

        // The read returns immediately with the stale value while the
        // refresh runs in the background: never absent, never blocked.
        let started = std::time::Instant::now();
        let dict = cache.get(&tenant).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(dict.model_count(), 1);
        assert_eq!(cache.generation(&tenant), Some(1));

        // Eventually the refresh publishes generation 2.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(cache.generation(&tenant), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_first_build_surfaces_to_waiter() {
        let calls = Arc::new(AtomicU64::new(0));
        let cache = DictionaryCache::new(
            counting_builder(Arc::clone(&calls), Duration::ZERO, true),
            2,
        );
        let tenant = Tenant::default();

        let err = cache.get(&tenant).await.unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_parent");
        assert!(cache.generation(&tenant).is_none());

        // No automatic retry was scheduled, but the next get retries.
        let first_calls = calls.load(Ordering::SeqCst);
        let _ = cache.get(&tenant).await;
        assert_eq!(calls.load(Ordering::SeqCst), first_calls + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_refresh_keeps_previous_generation() {
        let calls = Arc::new(AtomicU64::new(0));
        let cache = DictionaryCache::new(
            counting_builder(Arc::clone(&calls), Duration::ZERO, true),
            2,
        );
        let tenant = Tenant::default();

        cache.publish(&tenant, 1, CompiledDictionary::new());
        cache.invalidate(&tenant);

        // Stale value served; the background refresh fails quietly.
        let dict = cache.get(&tenant).await.unwrap();
        assert_eq!(dict.model_count(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        // Previous generation untouched by the failure.
        assert_eq!(cache.generation(&tenant), Some(1));
        assert!(cache.stats().snapshot().refresh_failures >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_caller_runs_when_pool_exhausted() {
        let calls = Arc::new(AtomicU64::new(0));
        let cache = Arc::new(DictionaryCache::new(
            counting_builder(Arc::clone(&calls), Duration::from_millis(200), false),
            1,
        ));

        // Saturate the single worker with tenant A's build.
        let cache_a = Arc::clone(&cache);
        let first = tokio::spawn(async move { cache_a.get(&Tenant::new("a")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Tenant B's build finds no free permit and runs on the caller.
        cache.get(&Tenant::new("b")).await.unwrap();
        first.await.unwrap().unwrap();

        let stats = cache.stats().snapshot();
        assert!(stats.caller_runs >= 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_rebuild_is_discarded() {
        let calls = Arc::new(AtomicU64::new(0));
        // Builder reports source version 1.
        let cache = DictionaryCache::new(
            counting_builder(Arc::clone(&calls), Duration::from_millis(100), false),
            2,
        );
        let tenant = Tenant::default();

        cache.publish(&tenant, 1, CompiledDictionary::new());
        cache.invalidate(&tenant);
        let _ = cache.get(&tenant).await.unwrap();

        // A writer publishes from a newer store version while the
        // background rebuild (source version 1) is still running.
        cache.publish(&tenant, 5, CompiledDictionary::new());

        tokio::time::sleep(Duration::from_millis(300)).await;
        // The stale rebuild must not have bumped the generation past the
        // writer's publication.
        assert_eq!(cache.generation(&tenant), Some(2));
    }

    #[test]
    fn test_stats_snapshot_serializes() {
        let stats = CacheStats::default();
        CacheStats::increment(&stats.hits);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 1);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"hits\":1"));
    }
}
