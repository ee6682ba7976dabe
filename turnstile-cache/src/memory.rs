//! Bounded in-memory reservation cache with background eviction.
//!
//! Reservations are held in a concurrent map. Each entry carries two
//! independent lifetimes:
//!
//! - the *stored* expiration (`DateTime<Utc>`), which is the reservation
//!   window communicated to the client — `lookup` hides an entry once this
//!   instant has passed, even before the entry is physically removed;
//! - the *physical* lifetime (`entry_lifetime`, relative to insertion),
//!   which bounds this process's memory footprint and is enforced by a
//!   periodic background scan.
//!
//! The two are intentionally decoupled; no ordering between them is assumed.
//!
//! When the map is at capacity, reserving a *new* key is a silent no-op:
//! the design favors availability of new requests over strict accounting,
//! accepting that a retry may be wrongly re-executed during overload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::traits::IdempotencyCache;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the in-memory reservation cache.
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of reservations held at once.
    pub capacity: usize,

    /// Physical lifetime of an entry, relative to its insertion.
    /// Entries older than this are purged by the background scan.
    pub entry_lifetime: Duration,

    /// How often the background scan purges physically-expired entries.
    pub scan_interval: Duration,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            entry_lifetime: Duration::from_secs(3600),
            scan_interval: Duration::from_secs(60),
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for cache activity.
///
/// All counters are monotonic since construction and safe to read
/// concurrently via [`CacheMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups that found a live reservation.
    pub hits: AtomicU64,

    /// Lookups that found nothing, or only a logically-expired entry.
    pub misses: AtomicU64,

    /// Reservations stored (including overwrites).
    pub reservations: AtomicU64,

    /// Reservations silently dropped because the cache was at capacity.
    pub rejected_at_capacity: AtomicU64,

    /// Entries removed by the background scan.
    pub evicted: AtomicU64,

    /// Completed background scan passes.
    pub scan_passes: AtomicU64,
}

impl CacheMetrics {
    /// Get a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            reservations: self.reservations.load(Ordering::Relaxed),
            rejected_at_capacity: self.rejected_at_capacity.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            scan_passes: self.scan_passes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of cache counters at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub reservations: u64,
    pub rejected_at_capacity: u64,
    pub evicted: u64,
    pub scan_passes: u64,
}

// ============================================================================
// IN-MEMORY CACHE
// ============================================================================

/// A stored reservation.
#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Logical expiration communicated to the client.
    expires_at: DateTime<Utc>,
    /// When the entry was inserted; drives physical eviction.
    inserted_at: Instant,
}

/// Bounded, self-expiring reservation cache.
///
/// One instance is shared for the process lifetime. Construction spawns the
/// background eviction task, so the cache must be created inside a Tokio
/// runtime. [`InMemoryIdempotencyCache::shutdown`] stops the task gracefully;
/// dropping the cache also releases it.
pub struct InMemoryIdempotencyCache {
    entries: Arc<DashMap<String, Entry>>,
    config: MemoryCacheConfig,
    metrics: Arc<CacheMetrics>,
    shutdown_tx: watch::Sender<bool>,
    scan_handle: Mutex<Option<JoinHandle<()>>>,
}

impl InMemoryIdempotencyCache {
    /// Create a new cache and spawn its eviction task.
    pub fn new(config: MemoryCacheConfig) -> Self {
        let entries: Arc<DashMap<String, Entry>> = Arc::new(DashMap::new());
        let metrics = Arc::new(CacheMetrics::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(eviction_task(
            entries.clone(),
            config.entry_lifetime,
            config.scan_interval,
            metrics.clone(),
            shutdown_rx,
        ));

        tracing::debug!(
            capacity = config.capacity,
            entry_lifetime_secs = config.entry_lifetime.as_secs(),
            scan_interval_secs = config.scan_interval.as_secs(),
            "In-memory idempotency cache started"
        );

        Self {
            entries,
            config,
            metrics,
            shutdown_tx,
            scan_handle: Mutex::new(Some(handle)),
        }
    }

    /// Number of entries currently held, including logically-expired ones
    /// awaiting physical eviction.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Activity counters for this cache instance.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Stop the background eviction task and wait for it to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self
            .scan_handle
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for InMemoryIdempotencyCache {
    fn drop(&mut self) {
        // Wake the eviction task so it exits instead of waiting on its timer.
        let _ = self.shutdown_tx.send(true);
    }
}

#[async_trait]
impl IdempotencyCache for InMemoryIdempotencyCache {
    async fn lookup(&self, key: &str) -> Option<DateTime<Utc>> {
        let live = self
            .entries
            .get(key)
            .map(|entry| entry.expires_at)
            .filter(|expires_at| *expires_at > Utc::now());

        match live {
            Some(expires_at) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                Some(expires_at)
            }
            None => {
                // Logically-expired entries are left for the scan to purge.
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn reserve(&self, key: &str, expires_at: DateTime<Utc>) {
        let exists = self.entries.contains_key(key);
        if !exists && self.entries.len() >= self.config.capacity {
            self.metrics
                .rejected_at_capacity
                .fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                capacity = self.config.capacity,
                "Reservation dropped: cache at capacity"
            );
            return;
        }

        self.entries.insert(
            key.to_owned(),
            Entry {
                expires_at,
                inserted_at: Instant::now(),
            },
        );
        self.metrics.reservations.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// BACKGROUND EVICTION
// ============================================================================

/// Periodic scan that purges physically-expired entries.
///
/// Runs until the shutdown signal is received. Each pass holds the map only
/// for the duration of one `retain` sweep, so concurrent lookups and reserves
/// are never blocked beyond a single pass.
async fn eviction_task(
    entries: Arc<DashMap<String, Entry>>,
    entry_lifetime: Duration,
    scan_interval: Duration,
    metrics: Arc<CacheMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut scan = interval(scan_interval);
    scan.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::debug!("Eviction task shutting down");
                    break;
                }
            }

            _ = scan.tick() => {
                let before = entries.len();
                entries.retain(|_, entry| entry.inserted_at.elapsed() < entry_lifetime);
                let evicted = before.saturating_sub(entries.len()) as u64;

                metrics.evicted.fetch_add(evicted, Ordering::Relaxed);
                metrics.scan_passes.fetch_add(1, Ordering::Relaxed);

                if evicted > 0 {
                    tracing::debug!(evicted, remaining = entries.len(), "Eviction pass completed");
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
