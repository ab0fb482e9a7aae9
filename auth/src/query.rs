//! Cached remote reads with freshness and idle eviction.
//!
//! DESIGN
//! ======
//! A [`Query`] is one cached value plus its fetch status, published through a
//! `watch` channel so views can follow it. Owners drive it: they call
//! [`Query::run`] (or the `begin`/`resolve` pair) with their own fetcher and
//! write through with [`Query::set_at`] after mutations.
//!
//! Every write bumps a generation counter. A fetch that resolves after a newer
//! write or a clear is discarded, so a sign-out racing a refetch cannot bring
//! the old session back.
//!
//! [`QueryClient`] is the registry used to clear every cache at once and to
//! evict entries nobody has read for a while.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Data younger than this is served without refetching on mount.
pub const STALE_AFTER: Duration = Duration::from_secs(5 * 60);
/// Unobserved data idle for this long is dropped.
pub const GC_AFTER: Duration = Duration::from_secs(10 * 60);
pub const GC_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq)]
pub enum QueryStatus<T, E> {
    /// Never fetched, cleared, or evicted.
    Empty,
    /// First fetch in flight.
    Loading,
    Present(T),
    /// Fetched; the remote has nothing.
    Absent,
    Errored(E),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<T, E> {
    pub status: QueryStatus<T, E>,
    /// True during any fetch, including a background refetch over `Present`.
    pub is_fetching: bool,
}

impl<T, E> Snapshot<T, E> {
    fn empty() -> Self {
        Self { status: QueryStatus::Empty, is_fetching: false }
    }

    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match &self.status {
            QueryStatus::Present(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match &self.status {
            QueryStatus::Errored(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.status, QueryStatus::Loading)
    }
}

/// Proof of a started fetch, checked when the result lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket(u64);

struct Timing {
    generation: u64,
    updated_at: Option<Instant>,
    last_read: Instant,
}

// =============================================================================
// QUERY
// =============================================================================

pub struct Query<T, E> {
    name: &'static str,
    tx: watch::Sender<Snapshot<T, E>>,
    timing: Mutex<Timing>,
}

impl<T, E> Query<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (tx, _) = watch::channel(Snapshot::empty());
        Self { name, tx, timing: Mutex::new(Timing { generation: 0, updated_at: None, last_read: Instant::now() }) }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current snapshot. Counts as a read for eviction.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T, E> {
        self.snapshot_at(Instant::now())
    }

    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> Snapshot<T, E> {
        self.lock_timing().last_read = now;
        self.tx.borrow().clone()
    }

    /// Follow changes. An open receiver keeps the entry from being evicted.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Snapshot<T, E>> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn is_stale_at(&self, now: Instant) -> bool {
        self.lock_timing().updated_at.is_none_or(|at| now.duration_since(at) >= STALE_AFTER)
    }

    /// Mark a fetch as started. `Present` data stays visible while fetching.
    pub fn begin(&self) -> FetchTicket {
        let generation = self.lock_timing().generation;
        self.tx.send_modify(|snap| {
            snap.is_fetching = true;
            if !matches!(snap.status, QueryStatus::Present(_)) {
                snap.status = QueryStatus::Loading;
            }
        });
        FetchTicket(generation)
    }

    /// Land a fetch result. Returns `false` when a newer write superseded it.
    ///
    /// A failed background refetch keeps the previous `Present` value.
    pub fn resolve_at(&self, ticket: FetchTicket, result: Result<Option<T>, E>, now: Instant) -> bool {
        {
            let mut timing = self.lock_timing();
            if timing.generation != ticket.0 {
                debug!(query = self.name, "discarding superseded fetch");
                return false;
            }
            timing.generation += 1;
            if result.is_ok() {
                timing.updated_at = Some(now);
            }
        }
        self.tx.send_modify(|snap| {
            snap.is_fetching = false;
            snap.status = match result {
                Ok(Some(value)) => QueryStatus::Present(value),
                Ok(None) => QueryStatus::Absent,
                Err(err) => {
                    if matches!(snap.status, QueryStatus::Present(_)) {
                        warn!(query = self.name, error = %err, "background refetch failed; keeping cached value");
                        return;
                    }
                    QueryStatus::Errored(err)
                }
            };
        });
        true
    }

    /// Fetch through `fetcher` and land the result.
    pub async fn run<F, Fut>(&self, fetcher: F) -> Snapshot<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let ticket = self.begin();
        let result = fetcher().await;
        self.resolve_at(ticket, result, Instant::now());
        self.tx.borrow().clone()
    }

    /// Write-through after a mutation. Supersedes any in-flight fetch.
    pub fn set_at(&self, value: Option<T>, now: Instant) {
        {
            let mut timing = self.lock_timing();
            timing.generation += 1;
            timing.updated_at = Some(now);
        }
        let status = match value {
            Some(value) => QueryStatus::Present(value),
            None => QueryStatus::Absent,
        };
        self.tx.send_replace(Snapshot { status, is_fetching: false });
    }

    /// Drop the cached value and any in-flight fetch.
    pub fn reset(&self) {
        {
            let mut timing = self.lock_timing();
            timing.generation += 1;
            timing.updated_at = None;
        }
        self.tx.send_replace(Snapshot::empty());
    }

    /// Evict when unobserved and idle past [`GC_AFTER`]. Returns whether it did.
    pub fn evict_idle_at(&self, now: Instant) -> bool {
        if self.tx.receiver_count() > 0 || matches!(self.tx.borrow().status, QueryStatus::Empty) {
            return false;
        }
        let idle = now.duration_since(self.lock_timing().last_read);
        if idle < GC_AFTER {
            return false;
        }
        debug!(query = self.name, idle_secs = idle.as_secs(), "evicting idle query");
        self.reset();
        true
    }

    fn lock_timing(&self) -> std::sync::MutexGuard<'_, Timing> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Type-erased view of a query for the registry.
pub trait CachedQuery: Send + Sync {
    fn name(&self) -> &'static str;
    fn reset(&self);
    fn evict_idle_at(&self, now: Instant) -> bool;
}

impl<T, E> CachedQuery for Query<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        Query::name(self)
    }

    fn reset(&self) {
        Query::reset(self);
    }

    fn evict_idle_at(&self, now: Instant) -> bool {
        Query::evict_idle_at(self, now)
    }
}

/// Registry of every cache the application holds.
#[derive(Clone, Default)]
pub struct QueryClient {
    queries: Arc<Mutex<Vec<Arc<dyn CachedQuery>>>>,
}

impl QueryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, query: Arc<dyn CachedQuery>) {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).push(query);
    }

    /// Reset every registered query.
    pub fn clear(&self) {
        let queries = self.queries.lock().unwrap_or_else(PoisonError::into_inner);
        for query in queries.iter() {
            query.reset();
        }
        info!(count = queries.len(), "query cache cleared");
    }

    /// Evict idle queries. Returns how many were dropped.
    pub fn collect_garbage_at(&self, now: Instant) -> usize {
        let queries = self.queries.lock().unwrap_or_else(PoisonError::into_inner);
        queries.iter().filter(|query| query.evict_idle_at(now)).count()
    }

    /// Sweep idle queries every `interval` until aborted.
    pub fn spawn_gc(&self, interval: Duration) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = client.collect_garbage_at(Instant::now());
                if evicted > 0 {
                    debug!(evicted, "query gc sweep");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
