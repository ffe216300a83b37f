use crate::error::{Error, Result};
use crate::query::key::QueryKey;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

type Data = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Entry {
    data: Option<Data>,
    error: Option<Error>,
    updated_at: Option<Instant>,
    invalidated: bool,
    fetching: bool,
    /// Bumped every time a fetch completes
    generation: u64,
    /// Bumped every time the entry is invalidated
    invalidations: u64,
}

/// Snapshot of a key's fetch state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStatus {
    /// First load: fetching with nothing to show yet
    pub is_loading: bool,
    /// Background refresh: fetching while older data is shown
    pub is_refetching: bool,
    pub is_stale: bool,
    pub has_data: bool,
    pub error: Option<Error>,
}

/// Keyed cache of query results.
///
/// Fetches of one key are serialized behind a per-key gate so concurrent
/// callers share a single in-flight call. Stale entries are refetched on
/// next access, never in the background.
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    gates: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
    stale_time: Option<Duration>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Clears the in-flight flag if the fetching future is dropped early
struct InFlight<'a> {
    cache: &'a QueryCache,
    key: &'a QueryKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.cache.entries().get_mut(self.key) {
            entry.fetching = false;
        }
    }
}

impl QueryCache {
    /// `stale_time` of `None` keeps data fresh until it is invalidated
    pub fn new(stale_time: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            stale_time,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn gate(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.entry(key.clone()).or_default().clone()
    }

    fn expired(&self, entry: &Entry) -> bool {
        match (self.stale_time, entry.updated_at) {
            (Some(stale_time), Some(updated_at)) => updated_at.elapsed() >= stale_time,
            _ => false,
        }
    }

    fn generation(&self, key: &QueryKey) -> u64 {
        self.entries().get(key).map(|e| e.generation).unwrap_or(0)
    }

    /// Cached data for `key` if it is present, error-free and not stale
    fn fresh<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        if entry.invalidated || entry.error.is_some() || self.expired(entry) {
            return None;
        }
        entry.data.as_ref()?.downcast_ref::<T>().cloned()
    }

    /// Outcome of the most recent completed fetch
    fn last_outcome<T: Clone + 'static>(&self, key: &QueryKey) -> Option<Result<T>> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        if let Some(err) = &entry.error {
            return Some(Err(err.clone()));
        }
        entry
            .data
            .as_ref()?
            .downcast_ref::<T>()
            .cloned()
            .map(Ok)
    }

    /// Return cached data when fresh, otherwise fetch it
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(data) = self.fresh::<T>(key) {
            debug!(%key, "cache hit");
            return Ok(data);
        }
        self.run(key, fetcher, false).await
    }

    /// Fetch even when cached data is fresh, joining any fetch already in flight
    pub async fn refetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(key, fetcher, true).await
    }

    async fn run<T, F, Fut>(&self, key: &QueryKey, fetcher: F, force: bool) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let seen = self.generation(key);
        let gate = self.gate(key);
        let result = {
            let _permit = gate.lock().await;
            self.run_gated(key, fetcher, force, seen).await
        };
        self.release_gate(key, gate);
        result
    }

    /// Drop the gate for `key` once nobody else holds or waits on it
    fn release_gate(&self, key: &QueryKey, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        let idle = gates
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, &gate) && Arc::strong_count(&gate) == 2);
        if idle {
            gates.remove(key);
        }
    }

    async fn run_gated<T, F, Fut>(
        &self,
        key: &QueryKey,
        fetcher: F,
        force: bool,
        seen: u64,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Another caller finished a fetch while we waited on the gate
        if self.generation(key) != seen {
            if let Some(outcome) = self.last_outcome::<T>(key) {
                debug!(%key, "joined in-flight fetch");
                return outcome;
            }
        }
        if !force {
            if let Some(data) = self.fresh::<T>(key) {
                return Ok(data);
            }
        }

        let started = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();
            entry.fetching = true;
            entry.invalidations
        };
        let in_flight = InFlight { cache: self, key };

        debug!(%key, "fetching");
        let result = fetcher().await;

        {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();
            entry.generation += 1;
            match &result {
                Ok(data) => {
                    entry.data = Some(Arc::new(data.clone()));
                    entry.error = None;
                    entry.updated_at = Some(Instant::now());
                    // An invalidation during the fetch leaves the result stale
                    entry.invalidated = entry.invalidations != started;
                }
                Err(err) => {
                    debug!(%key, error = %err, "fetch failed");
                    entry.error = Some(err.clone());
                }
            }
        }
        drop(in_flight);

        result
    }

    /// Cached data for `key` regardless of staleness
    pub fn get_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries();
        entries.get(key)?.data.as_ref()?.downcast_ref::<T>().cloned()
    }

    /// Write data directly, marking it fresh
    pub fn set_data<T: Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
        let mut entries = self.entries();
        let entry = entries.entry(key.clone()).or_default();
        entry.data = Some(Arc::new(data));
        entry.error = None;
        entry.updated_at = Some(Instant::now());
        entry.invalidated = false;
        debug!(%key, "cache written");
    }

    /// Evict the entry for exactly this key
    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.entries().remove(key).is_some();
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        if gates.get(key).is_some_and(|gate| Arc::strong_count(gate) == 1) {
            gates.remove(key);
        }
        drop(gates);
        if removed {
            debug!(%key, "cache entry removed");
        }
        removed
    }

    /// Mark every entry under `prefix` stale and return how many were marked
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut marked = 0;
        for (key, entry) in self.entries().iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                entry.invalidations += 1;
                marked += 1;
            }
        }
        debug!(%prefix, marked, "invalidated");
        marked
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        let entries = self.entries();
        let Some(entry) = entries.get(key) else {
            return QueryStatus::default();
        };
        let has_data = entry.data.is_some();
        QueryStatus {
            is_loading: entry.fetching && !has_data,
            is_refetching: entry.fetching && has_data,
            is_stale: has_data && (entry.invalidated || self.expired(entry)),
            has_data,
            error: entry.error.clone(),
        }
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.status(key).is_stale
    }

    /// Keys currently cached under `prefix`
    pub fn keys(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        self.entries()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }
}
