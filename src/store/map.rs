//! TTL Map Module
//!
//! Concurrent key-value map where every entry carries an absolute expiry.
//! Point operations are atomic per key; dead entries are never reported live.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::store::Entry;
use crate::tasks::{spawn_sweep_task, DelayFn, Sweep};

// == Sweep Mode ==
/// How dead entries get physically removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Dead entries linger until overwritten or removed; counts filter them out.
    Lazy,
    /// A background task removes dead entries on a fixed cadence.
    FixedInterval,
}

/// Shared state behind every [`TtlMap`] handle.
struct Inner<K, V> {
    data: DashMap<K, Entry<V>>,
    fixed_interval: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Sweep for Inner<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        // `retain` re-checks each entry under its shard lock, so an entry
        // refreshed by a concurrent writer is kept.
        self.data.retain(|_, entry| {
            let live = entry.is_live_at(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }
}

impl<K, V> Drop for Inner<K, V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

// == TTL Map ==
/// Thread-safe map from key to value with a per-entry time-to-live.
///
/// Cloning a `TtlMap` yields another handle to the same storage. All
/// operations take `&self`; no external locking is needed.
///
/// Point lookups (`load`, `load_or_store`, `swap`, compare operations) treat
/// dead entries as absent in every [`SweepMode`]. Only [`len`](Self::len)
/// depends on the mode.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ttlmap::TtlMap;
///
/// let map = TtlMap::new();
/// map.store("a", 1, Duration::from_secs(60));
/// assert_eq!(map.load(&"a"), Some(1));
///
/// let (actual, loaded) = map.load_or_store("a", 2, Duration::from_secs(60));
/// assert_eq!((actual, loaded), (1, true));
/// ```
pub struct TtlMap<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for TtlMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for TtlMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for TtlMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlMap")
            .field("fixed_interval", &self.inner.fixed_interval.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty map in [`SweepMode::Lazy`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                data: DashMap::new(),
                fixed_interval: AtomicBool::new(false),
                sweeper: Mutex::new(None),
            }),
        }
    }

    // == Store ==
    /// Inserts or replaces `key`, live for `ttl` from now.
    pub fn store(&self, key: K, value: V, ttl: Duration) {
        self.inner.data.insert(key, Entry::new(value, ttl));
    }

    // == Load ==
    /// Returns the value of a live entry.
    ///
    /// A dead entry is reported as `None` but left in place.
    pub fn load(&self, key: &K) -> Option<V> {
        self.inner
            .data
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value().value.clone())
    }

    // == Load Or Store ==
    /// Returns the live value for `key` if there is one, otherwise inserts
    /// `value` for `ttl`.
    ///
    /// The boolean is `true` when an existing entry was loaded. A loaded
    /// entry keeps its original expiry; it is never refreshed here.
    pub fn load_or_store(&self, key: K, value: V, ttl: Duration) -> (V, bool) {
        match self.inner.data.entry(key) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    (occupied.get().value.clone(), true)
                } else {
                    occupied.insert(Entry::new(value.clone(), ttl));
                    (value, false)
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(value.clone(), ttl));
                (value, false)
            }
        }
    }

    // == Load And Delete ==
    /// Removes `key` and returns its value if the entry was live.
    pub fn load_and_delete(&self, key: &K) -> Option<V> {
        self.inner
            .data
            .remove(key)
            .filter(|(_, entry)| entry.is_live())
            .map(|(_, entry)| entry.value)
    }

    // == Delete ==
    /// Removes `key`; no-op if absent.
    pub fn delete(&self, key: &K) {
        self.inner.data.remove(key);
    }

    // == Swap ==
    /// Replaces the entry for `key`, live for `ttl` from now, and returns the
    /// previous value if it was live.
    pub fn swap(&self, key: K, value: V, ttl: Duration) -> Option<V> {
        self.inner
            .data
            .insert(key, Entry::new(value, ttl))
            .filter(|previous| previous.is_live())
            .map(|previous| previous.value)
    }

    // == Touch ==
    /// Re-arms the expiry of a live entry to `ttl` from now.
    ///
    /// Returns `false` if the key is absent or dead.
    pub fn touch(&self, key: &K, ttl: Duration) -> bool {
        match self.inner.data.get_mut(key) {
            Some(mut entry) if entry.is_live() => {
                entry.refresh(ttl);
                true
            }
            _ => false,
        }
    }

    // == TTL Remaining ==
    /// Remaining lifetime of a live entry.
    pub fn ttl_remaining(&self, key: &K) -> Option<Duration> {
        self.inner
            .data
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.ttl_remaining())
    }

    // == Length ==
    /// Number of entries.
    ///
    /// In [`SweepMode::Lazy`] this is the exact count of live entries. In
    /// [`SweepMode::FixedInterval`] it is the physical count, which may still
    /// include entries that died since the last sweep.
    pub fn len(&self) -> usize {
        if self.inner.fixed_interval.load(Ordering::Acquire) {
            self.inner.data.len()
        } else {
            let now = Instant::now();
            self.inner
                .data
                .iter()
                .filter(|entry| entry.is_live_at(now))
                .count()
        }
    }

    // == Is Empty ==
    /// Returns true when [`len`](Self::len) is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Enumeration ==
    /// Snapshot of the live keys.
    pub fn keys(&self) -> Vec<K> {
        self.snapshot().into_iter().map(|(key, _)| key).collect()
    }

    /// Snapshot of the live values.
    pub fn values(&self) -> Vec<V> {
        self.snapshot().into_iter().map(|(_, value)| value).collect()
    }

    /// Visits a snapshot of the live entries until `visitor` returns `false`.
    ///
    /// The snapshot is taken before the first call, so the visitor may freely
    /// call back into the map. Mutations made during the walk are not seen.
    pub fn range<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self.snapshot() {
            if !visitor(&key, &value) {
                break;
            }
        }
    }

    fn snapshot(&self) -> Vec<(K, V)> {
        let now = Instant::now();
        self.inner
            .data
            .iter()
            .filter(|entry| entry.is_live_at(now))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect()
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.data.clear();
    }

    // == Sweep ==
    /// Runs one sweep pass synchronously, returning the number of dead
    /// entries removed.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    /// The current sweep mode.
    pub fn sweep_mode(&self) -> SweepMode {
        if self.inner.fixed_interval.load(Ordering::Acquire) {
            SweepMode::FixedInterval
        } else {
            SweepMode::Lazy
        }
    }

    /// Switches to [`SweepMode::FixedInterval`] and starts a background sweep
    /// task on the current Tokio runtime.
    ///
    /// `delay_fn` is called before each pass. Calling this again replaces the
    /// running sweeper; two sweepers never run for the same map.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::MissingRuntime`] when called outside a Tokio
    /// runtime. The map stays in its previous mode.
    pub fn enable_fixed_interval_sweep<F>(&self, delay_fn: F) -> Result<()>
    where
        F: FnMut() -> Duration + Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CacheError::MissingRuntime);
        }

        let delay_fn: DelayFn = Box::new(delay_fn);
        let mut slot = self.inner.sweeper.lock();
        if let Some(previous) = slot.take() {
            warn!("Replacing running sweep task");
            previous.abort();
        }
        *slot = Some(spawn_sweep_task(Arc::downgrade(&self.inner), delay_fn));
        self.inner.fixed_interval.store(true, Ordering::Release);

        Ok(())
    }

    /// Builder form of [`enable_fixed_interval_sweep`](Self::enable_fixed_interval_sweep).
    pub fn with_fixed_interval_sweep<F>(self, delay_fn: F) -> Result<Self>
    where
        F: FnMut() -> Duration + Send + 'static,
    {
        self.enable_fixed_interval_sweep(delay_fn)?;
        Ok(self)
    }

    /// Stops the background sweeper, if any, and returns to [`SweepMode::Lazy`].
    pub fn disable_fixed_interval_sweep(&self) {
        let mut slot = self.inner.sweeper.lock();
        if let Some(handle) = slot.take() {
            handle.abort();
            debug!("Sweep task stopped");
        }
        self.inner.fixed_interval.store(false, Ordering::Release);
    }
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    // == Compare And Swap ==
    /// Replaces the value of `key` with `new` if its live value equals `old`.
    ///
    /// The entry keeps its existing expiry. A dead entry never compares equal.
    pub fn compare_and_swap(&self, key: &K, old: &V, new: V) -> bool {
        match self.inner.data.get_mut(key) {
            Some(mut entry) if entry.is_live() && entry.value().value == *old => {
                entry.value_mut().value = new;
                true
            }
            _ => false,
        }
    }

    // == Compare And Delete ==
    /// Removes `key` if its live value equals `old`.
    pub fn compare_and_delete(&self, key: &K, old: &V) -> bool {
        self.inner
            .data
            .remove_if(key, |_, entry| entry.is_live() && entry.value == *old)
            .is_some()
    }
}
