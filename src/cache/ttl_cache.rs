//! TTL Cache Module
//!
//! String-keyed cache of heterogeneous values with one fixed time-to-live.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::stats::CacheCounters;
use crate::cache::{CacheStats, CacheValue};
use crate::error::{CacheError, Result};
use crate::store::{nonzero_ttl, TtlMap};

// == Cacher ==
/// The capability set consumed by response caching.
///
/// Kept narrow so a remote backend can stand in for [`TtlCache`].
pub trait Cacher: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn set<T>(&self, key: &str, value: T)
    where
        T: Serialize + Send + Sync + 'static;

    /// Recovers the value under `key` as a `D`.
    ///
    /// # Errors
    ///
    /// - [`CacheError::NotFound`] if the key is absent or expired
    /// - [`CacheError::Deserialization`] if the value cannot be turned into a `D`
    fn get<D>(&self, key: &str) -> Result<D>
    where
        D: DeserializeOwned + Clone + 'static;

    fn delete(&self, key: &str);

    /// Stores `value` only when no live entry exists for `key`.
    ///
    /// Returns `true` when the value was stored. An existing entry is left
    /// untouched, expiry included.
    fn set_if_absent<T>(&self, key: &str, value: T) -> bool
    where
        T: Serialize + Send + Sync + 'static;

    /// Like [`get`](Self::get), writing the result into `dest`.
    ///
    /// `dest` is only written on success.
    fn get_into<D>(&self, key: &str, dest: &mut D) -> Result<()>
    where
        D: DeserializeOwned + Clone + 'static,
    {
        *dest = self.get(key)?;
        Ok(())
    }
}

// == TTL Cache ==
/// In-memory [`Cacher`] backed by a [`TtlMap`].
///
/// Every entry lives for the TTL given at construction.
#[derive(Debug, Clone)]
pub struct TtlCache {
    map: TtlMap<String, CacheValue>,
    ttl: Duration,
    counters: Arc<CacheCounters>,
}

impl TtlCache {
    // == Constructor ==
    /// Creates a lazily-expiring cache whose entries live for `ttl`.
    ///
    /// A zero `ttl` is raised to [`MIN_TTL`](crate::store::MIN_TTL).
    pub fn new(ttl: Duration) -> Self {
        Self {
            map: TtlMap::new(),
            ttl: nonzero_ttl(ttl),
            counters: Arc::new(CacheCounters::default()),
        }
    }

    /// Adds a background sweep every `period`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::MissingRuntime`] outside a Tokio runtime.
    pub fn with_sweep_interval(self, period: Duration) -> Result<Self> {
        self.map.enable_fixed_interval_sweep(move || period)?;
        Ok(self)
    }

    /// The TTL applied to every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries, see [`TtlMap::len`].
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit/miss counters and entry count.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.map.len())
    }
}

impl Cacher for TtlCache {
    fn set<T>(&self, key: &str, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.map.store(key.to_string(), CacheValue::new(value), self.ttl);
    }

    fn get<D>(&self, key: &str) -> Result<D>
    where
        D: DeserializeOwned + Clone + 'static,
    {
        let Some(value) = self.map.load(&key.to_string()) else {
            self.counters.record_miss();
            debug!("Cache miss for {}", key);
            return Err(CacheError::NotFound(key.to_string()));
        };
        self.counters.record_hit();

        value
            .recover()
            .map_err(|source| CacheError::Deserialization {
                key: key.to_string(),
                source,
            })
    }

    fn delete(&self, key: &str) {
        self.map.delete(&key.to_string());
    }

    fn set_if_absent<T>(&self, key: &str, value: T) -> bool
    where
        T: Serialize + Send + Sync + 'static,
    {
        // load_or_store leaves a live entry (and its expiry) as it is.
        let (_, loaded) = self
            .map
            .load_or_store(key.to_string(), CacheValue::new(value), self.ttl);
        !loaded
    }
}
