//! The query cache itself.
//!
//! All entry state sits behind one mutex that is only ever held for short,
//! non-awaiting critical sections, so each read, write, invalidation and
//! settlement is a discrete step that never interleaves with another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agrisense_core::{QueryKey, RemoteError, Timestamp};
use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::watch;

use crate::fetcher::QueryFetcher;
use crate::generation::{Generation, GenerationSource};
use crate::retry::RetryPolicy;
use crate::snapshot::{QuerySnapshot, QueryStatus};
use crate::stats::CacheStats;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, RemoteError>>>;

/// Configuration for the query cache.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Retry policy applied to every fetch. Writes are never retried.
    pub retry: RetryPolicy,
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Process-wide cache of remote resources, keyed by [`QueryKey`].
///
/// Cloning is cheap and every clone shares the same entries, so one cache
/// can be handed to every component that needs it.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                generations: GenerationSource::default(),
                config,
                stats: Mutex::new(CacheStats::default()),
            }),
        }
    }

    /// Create a cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Current state of a key, without side effects.
    pub fn peek(&self, key: &QueryKey) -> QuerySnapshot {
        self.inner
            .entries()
            .get(key)
            .map(Entry::snapshot)
            .unwrap_or_else(QuerySnapshot::idle)
    }

    /// Non-blocking read.
    ///
    /// A fresh resolved entry is returned as is. Otherwise exactly one fetch
    /// is started in the background (or the running one is joined) and the
    /// loading snapshot is returned; subscribers see the result when it
    /// settles.
    pub fn read(&self, key: &QueryKey, fetcher: Arc<dyn QueryFetcher>) -> QuerySnapshot {
        let mut entries = self.inner.entries();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        if entry.is_fresh() {
            self.inner.record(|s| s.hits += 1);
            return entry.snapshot();
        }
        self.inner.record(|s| s.misses += 1);
        if entry.in_flight.is_some() {
            self.inner.record(|s| s.deduplicated += 1);
        } else {
            // The spawned driver owns completion; this read doesn't wait.
            let _ = self.inner.begin_fetch(key, entry, fetcher);
        }
        entry.snapshot()
    }

    /// Resolve a key, fetching at most once no matter how many callers ask
    /// concurrently.
    ///
    /// Returns the value the cache settled on: if a write lands while the
    /// fetch is in flight, callers receive the written value.
    pub async fn fetch(
        &self,
        key: &QueryKey,
        fetcher: Arc<dyn QueryFetcher>,
    ) -> Result<Value, RemoteError> {
        let pending = {
            let mut entries = self.inner.entries();
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
            if entry.is_fresh() {
                if let Some(value) = &entry.data {
                    self.inner.record(|s| s.hits += 1);
                    return Ok(value.clone());
                }
            }
            self.inner.record(|s| s.misses += 1);
            match &entry.in_flight {
                Some(in_flight) => {
                    self.inner.record(|s| s.deduplicated += 1);
                    tracing::trace!(key = %key, "Joining in-flight fetch");
                    in_flight.future.clone()
                }
                None => self.inner.begin_fetch(key, entry, fetcher),
            }
        };

        let result = pending.await;
        match self.fresh_value(key) {
            Some(value) => Ok(value),
            None => result,
        }
    }

    /// Seed an entry with a known value, notifying subscribers.
    ///
    /// Always applies, and any fetch still in flight for the key will be
    /// discarded when it settles.
    pub fn write(&self, key: &QueryKey, value: Value) {
        let generation = self.issue_generation();
        self.write_at(key, generation, value);
    }

    /// Write on behalf of an operation that obtained `generation` before it
    /// started.
    ///
    /// Applies only if no write issued after `generation` has already
    /// applied, so the cache reflects the order operations were issued in
    /// rather than the order their responses arrived. Returns whether the
    /// write applied.
    pub fn write_at(&self, key: &QueryKey, generation: Generation, value: Value) -> bool {
        let mut entries = self.inner.entries();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        if !generation.is_newer_than(&entry.last_write) {
            self.inner.record(|s| s.rejected_writes += 1);
            tracing::debug!(
                key = %key,
                generation = %generation,
                last_write = %entry.last_write,
                "Rejected superseded write"
            );
            return false;
        }
        entry.last_write = generation;
        // Floors are issued under the entries lock, same as fetch stamps.
        entry.floor = self.inner.generations.next();
        entry.data = Some(value);
        entry.error = None;
        entry.status = QueryStatus::Resolved;
        entry.stale = false;
        entry.in_flight = None;
        entry.updated_at = Some(Utc::now());
        entry.publish();
        self.inner.record(|s| s.writes += 1);
        tracing::debug!(key = %key, generation = %generation, "Cache entry written");
        true
    }

    /// Stamp for an operation about to start; pass it to [`write_at`].
    ///
    /// [`write_at`]: QueryCache::write_at
    pub fn issue_generation(&self) -> Generation {
        self.inner.generations.next()
    }

    /// Mark an entry stale so the next read fetches again.
    ///
    /// Cached data stays visible until the re-fetch settles. A fetch already
    /// in flight is detached and its result discarded. Returns whether the
    /// key was cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.entries();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.invalidate(self.inner.generations.next());
                self.inner.record(|s| s.invalidations += 1);
                tracing::debug!(key = %key, "Cache entry invalidated");
                true
            }
            None => false,
        }
    }

    /// Invalidate every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.inner.entries();
        let floor = self.inner.generations.next();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidate(floor);
                count += 1;
            }
        }
        self.inner.record(|s| s.invalidations += count as u64);
        tracing::debug!(prefix = %prefix, count, "Cache entries invalidated by prefix");
        count
    }

    /// Drop an entry entirely. Subscribers observe an idle snapshot and then
    /// a closed channel.
    pub fn remove(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let removed = self.inner.entries().remove(key)?;
        let snapshot = removed.snapshot();
        removed.tx.send_replace(QuerySnapshot::idle());
        Some(snapshot)
    }

    /// Watch a key. The receiver starts at the current snapshot.
    pub fn subscribe(&self, key: &QueryKey) -> watch::Receiver<QuerySnapshot> {
        let mut entries = self.inner.entries();
        entries
            .entry(key.clone())
            .or_insert_with(Entry::new)
            .tx
            .subscribe()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entry_count = self.inner.entries().len() as u64;
        let mut stats = self
            .inner
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        stats.entry_count = entry_count;
        stats
    }

    fn fresh_value(&self, key: &QueryKey) -> Option<Value> {
        self.inner
            .entries()
            .get(key)
            .filter(|entry| entry.is_fresh())
            .and_then(|entry| entry.data.clone())
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    generations: GenerationSource,
    config: CacheConfig,
    stats: Mutex<CacheStats>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut stats);
    }

    /// Start the single fetch for `entry`. Caller holds the entries lock.
    fn begin_fetch(
        self: &Arc<Self>,
        key: &QueryKey,
        entry: &mut Entry,
        fetcher: Arc<dyn QueryFetcher>,
    ) -> SharedFetch {
        let started_at = self.generations.next();
        let inner = Arc::clone(self);
        let owned_key = key.clone();
        let future = async move {
            let result = fetch_with_retry(&inner.config.retry, &owned_key, fetcher.as_ref()).await;
            inner.settle(&owned_key, started_at, &result);
            result
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            started_at,
            future: future.clone(),
        });
        if entry.data.is_none() {
            entry.status = QueryStatus::Pending;
        }
        entry.publish();
        self.record(|s| s.fetches += 1);
        tracing::debug!(key = %key, generation = %started_at, "Fetch started");

        // Drive the fetch even if every awaiting caller goes away.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(future.clone().map(|_| ()));
            }
            Err(_) => {
                tracing::debug!(key = %key, "No runtime; fetch is driven by its callers");
            }
        }
        future
    }

    fn settle(&self, key: &QueryKey, started_at: Generation, result: &Result<Value, RemoteError>) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            tracing::debug!(key = %key, "Fetch settled for a removed entry");
            return;
        };
        if matches!(&entry.in_flight, Some(in_flight) if in_flight.started_at == started_at) {
            entry.in_flight = None;
        }
        if !started_at.is_newer_than(&entry.floor) {
            self.record(|s| s.rejected_writes += 1);
            tracing::debug!(
                key = %key,
                generation = %started_at,
                floor = %entry.floor,
                "Discarded fetch result superseded by a newer change"
            );
            entry.publish();
            return;
        }
        match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.error = None;
                entry.status = QueryStatus::Resolved;
                tracing::debug!(key = %key, generation = %started_at, "Fetch resolved");
            }
            Err(err) => {
                entry.error = Some(err.clone());
                entry.status = QueryStatus::Errored;
                tracing::warn!(
                    key = %key,
                    status = ?err.status_code(),
                    retained_data = entry.data.is_some(),
                    "Fetch failed"
                );
            }
        }
        entry.floor = started_at;
        entry.stale = false;
        entry.updated_at = Some(Utc::now());
        entry.publish();
    }
}

async fn fetch_with_retry(
    policy: &RetryPolicy,
    key: &QueryKey,
    fetcher: &dyn QueryFetcher,
) -> Result<Value, RemoteError> {
    let mut attempt = 1;
    loop {
        match fetcher.fetch(key).await {
            Ok(value) => return Ok(value),
            Err(err) if policy.should_retry(attempt, &err) => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    key = %key,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    status = ?err.status_code(),
                    "Fetch attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

struct InFlight {
    started_at: Generation,
    future: SharedFetch,
}

struct Entry {
    data: Option<Value>,
    error: Option<RemoteError>,
    status: QueryStatus,
    stale: bool,
    /// Fetches started at or before this generation may not settle.
    floor: Generation,
    /// Generation of the last write that applied.
    last_write: Generation,
    updated_at: Option<Timestamp>,
    in_flight: Option<InFlight>,
    tx: watch::Sender<QuerySnapshot>,
}

impl Entry {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(QuerySnapshot::idle());
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            stale: false,
            floor: Generation::ZERO,
            last_write: Generation::ZERO,
            updated_at: None,
            in_flight: None,
            tx,
        }
    }

    fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Resolved && !self.stale
    }

    fn invalidate(&mut self, floor: Generation) {
        self.stale = true;
        self.floor = floor;
        self.in_flight = None;
        self.publish();
    }

    fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            data: self.data.clone(),
            error: self.error.clone(),
            status: self.status,
            is_stale: self.stale,
            is_fetching: self.in_flight.is_some(),
            updated_at: self.updated_at,
        }
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot());
    }
}
