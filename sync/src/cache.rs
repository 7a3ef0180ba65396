//! Process-wide query cache.
//!
//! One [`Entry`] per [`QueryKey`], created on first access and kept for the
//! life of the cache. Views hold an [`Observer`]; while an observer for a
//! polled key exists, a poller refreshes it on a fixed interval.
//!
//! Every fetch takes the entry's next sequence number. A result is applied
//! only when its sequence number is above the last applied one, so a slow
//! response can never overwrite a newer one.

use chrono::{DateTime, Utc};
use common::{Job, JobStats, Page, QueryData, QueryFamily, QueryKey};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::PollingConfig;
use crate::error::SyncError;
use crate::metrics::SyncMetrics;
use crate::poller;
use crate::transport::Transport;

/// What a view sees for one query.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub data: Option<Arc<QueryData>>,
    pub error: Option<Arc<SyncError>>,
    /// No data, no error yet and a fetch is running.
    pub is_loading: bool,
    pub is_fetching: bool,
    /// Invalidated and not yet refetched.
    pub is_stale: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl QueryState {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn stats(&self) -> Option<&JobStats> {
        self.data.as_deref().and_then(QueryData::as_stats)
    }

    pub fn page(&self) -> Option<&Page<Job>> {
        self.data.as_deref().and_then(QueryData::as_page)
    }

    pub fn job(&self) -> Option<&Job> {
        self.data.as_deref().and_then(QueryData::as_job)
    }
}

/// Shared by the cache, its fetch tasks and its pollers.
pub(crate) struct CacheContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) metrics: Arc<SyncMetrics>,
    pub(crate) poll_interval: Duration,
    pub(crate) stale_time: Duration,
}

#[derive(Default)]
struct EntryInner {
    data: Option<Arc<QueryData>>,
    error: Option<Arc<SyncError>>,
    fetched_at: Option<Instant>,
    updated_at: Option<DateTime<Utc>>,
    stale: bool,
    next_seq: u64,
    applied_seq: u64,
    /// Newest outstanding fetch.
    in_flight: Option<u64>,
    /// Fetches numbered at or above this started after the last invalidation.
    invalidated_at: u64,
    observers: usize,
    poller: Option<JoinHandle<()>>,
}

impl EntryInner {
    fn snapshot(&self) -> QueryState {
        QueryState {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.data.is_none() && self.error.is_none() && self.in_flight.is_some(),
            is_fetching: self.in_flight.is_some(),
            is_stale: self.stale,
            updated_at: self.updated_at,
        }
    }

    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.stale
            && self.data.is_some()
            && self
                .fetched_at
                .is_some_and(|at| at.elapsed() < stale_time)
    }
}

pub(crate) struct Entry {
    key: QueryKey,
    inner: Mutex<EntryInner>,
    tx: watch::Sender<QueryState>,
}

impl Entry {
    fn new(key: QueryKey) -> Self {
        let (tx, _rx) = watch::channel(QueryState::default());
        Self {
            key,
            inner: Mutex::new(EntryInner {
                next_seq: 1,
                ..Default::default()
            }),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EntryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &EntryInner) {
        self.tx.send_replace(inner.snapshot());
    }

    pub(crate) fn key(&self) -> &QueryKey {
        &self.key
    }

    pub(crate) fn is_observed(&self) -> bool {
        self.lock().observers > 0
    }

    /// Starts a fetch unless one that began after the last invalidation is
    /// already running, in which case the caller simply waits on that one.
    pub(crate) fn start_fetch(self: &Arc<Self>, ctx: &Arc<CacheContext>) -> bool {
        let seq = {
            let mut inner = self.lock();
            if inner.in_flight.is_some_and(|s| s >= inner.invalidated_at) {
                return false;
            }
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.in_flight = Some(seq);
            self.publish(&inner);
            seq
        };

        ctx.metrics.record_fetch(self.key.resource());
        log::debug!("fetching {} (seq {})", self.key, seq);

        let entry = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let endpoint = entry.key.endpoint();
            let result = ctx
                .transport
                .send(&endpoint, None)
                .await
                .map(|raw| entry.key.decode(&raw));
            entry.complete(&ctx, seq, result);
        });
        true
    }

    fn complete(&self, ctx: &CacheContext, seq: u64, result: Result<QueryData, SyncError>) {
        let mut inner = self.lock();
        if inner.in_flight == Some(seq) {
            inner.in_flight = None;
        }

        if seq <= inner.applied_seq {
            log::debug!(
                "dropping result for {} (seq {}, already applied {})",
                self.key,
                seq,
                inner.applied_seq
            );
            ctx.metrics.record_superseded(self.key.resource());
            self.publish(&inner);
            return;
        }
        inner.applied_seq = seq;

        match result {
            Ok(data) => {
                inner.data = Some(Arc::new(data));
                inner.error = None;
                inner.fetched_at = Some(Instant::now());
                inner.updated_at = Some(Utc::now());
                if seq >= inner.invalidated_at {
                    inner.stale = false;
                }
            }
            Err(e) => {
                log::warn!("fetch {} failed: {}", self.key, e);
                ctx.metrics.record_failure(self.key.resource());
                inner.error = Some(Arc::new(e));
            }
        }
        self.publish(&inner);
    }
}

pub struct QueryCache {
    ctx: Arc<CacheContext>,
    entries: DashMap<QueryKey, Arc<Entry>>,
}

impl QueryCache {
    pub fn new(transport: Arc<dyn Transport>, polling: &PollingConfig) -> Self {
        Self::with_metrics(transport, polling, Arc::new(SyncMetrics::new()))
    }

    pub fn with_metrics(
        transport: Arc<dyn Transport>,
        polling: &PollingConfig,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            ctx: Arc::new(CacheContext {
                transport,
                metrics,
                poll_interval: polling.interval(),
                stale_time: polling.stale_time(),
            }),
            entries: DashMap::new(),
        }
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.ctx.metrics
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.ctx.transport
    }

    fn entry(&self, key: &QueryKey) -> Arc<Entry> {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Entry::new(key.clone())))
            .value()
            .clone()
    }

    /// Registers a view's interest in `key`.
    ///
    /// Cached data is visible on the returned observer straight away. A fetch
    /// is started when there is no data, the entry was invalidated, or the data
    /// is older than the stale time; an already running fetch is joined. The
    /// first observer of a polled key starts its poller.
    pub fn observe(&self, key: QueryKey) -> Observer {
        let entry = self.entry(&key);
        let needs_fetch = {
            let mut inner = entry.lock();
            inner.observers += 1;
            if inner.observers == 1 && key.poll_interval().is_some() {
                let handle =
                    poller::spawn(Arc::clone(&entry), Arc::clone(&self.ctx), self.ctx.poll_interval);
                inner.poller = Some(handle);
            }
            !inner.is_fresh(self.ctx.stale_time)
        };

        if needs_fetch {
            entry.start_fetch(&self.ctx);
        }

        let rx = entry.tx.subscribe();
        Observer {
            entry,
            ctx: Arc::clone(&self.ctx),
            rx,
        }
    }

    /// Current state of `key` without observing it.
    pub fn peek(&self, key: &QueryKey) -> QueryState {
        self.entries
            .get(key)
            .map(|e| e.tx.borrow().clone())
            .unwrap_or_default()
    }

    pub fn is_polling(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .map(|e| e.lock().poller.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Marks every entry in `family` stale. Observed entries refetch right
    /// away; the rest refetch on their next observation. Returns how many
    /// entries were marked.
    pub fn invalidate(&self, family: &QueryFamily) -> usize {
        let targets: Vec<Arc<Entry>> = self
            .entries
            .iter()
            .filter(|e| e.key().belongs_to(family))
            .map(|e| Arc::clone(e.value()))
            .collect();

        for entry in &targets {
            let observed = {
                let mut inner = entry.lock();
                inner.stale = true;
                inner.invalidated_at = inner.next_seq;
                entry.publish(&inner);
                inner.observers > 0
            };
            self.ctx.metrics.record_invalidation(entry.key().resource());
            log::debug!("invalidated {} (observed: {})", entry.key(), observed);
            if observed {
                entry.start_fetch(&self.ctx);
            }
        }
        targets.len()
    }

    /// Stops every poller. In-flight fetches are left to finish.
    pub fn shutdown(&self) {
        for e in self.entries.iter() {
            if let Some(handle) = e.lock().poller.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for QueryCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A view's handle on one query. Dropping it ends the observation; the last
/// observer of a key stops its poller.
pub struct Observer {
    entry: Arc<Entry>,
    ctx: Arc<CacheContext>,
    rx: watch::Receiver<QueryState>,
}

impl Observer {
    pub fn key(&self) -> &QueryKey {
        self.entry.key()
    }

    pub fn state(&self) -> QueryState {
        self.rx.borrow().clone()
    }

    /// Waits for the next update of this query.
    pub async fn changed(&mut self) -> QueryState {
        // The sender lives in the entry we hold, so this cannot close.
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    /// Waits until no fetch is running for this query.
    pub async fn settled(&mut self) -> QueryState {
        let settled = self.rx.wait_for(|s| !s.is_fetching).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Manual refresh: joins a running fetch or starts one, then waits for it.
    pub async fn refetch(&mut self) -> QueryState {
        self.entry.start_fetch(&self.ctx);
        self.settled().await
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        let mut inner = self.entry.lock();
        inner.observers = inner.observers.saturating_sub(1);
        if inner.observers == 0 {
            if let Some(handle) = inner.poller.take() {
                handle.abort();
                log::debug!("stopped polling {}", self.entry.key());
            }
        }
    }
}
