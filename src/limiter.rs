//! Per-Key Rate Limiter Registry
//!
//! Keeps one GCRA limiter per client key in a TTL store. A limiter that sees
//! no traffic for the idle timeout expires with its entry, so memory stays
//! bounded under client churn without any manual cleanup.

use std::hash::Hash;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};

use crate::error::Result;
use crate::store::{nonzero_ttl, TtlMap};

/// Single-client limiter held by the registry.
pub type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Rate limiter registry keyed by client identifier.
#[derive(Clone)]
pub struct KeyedRateLimiter<K> {
    limiters: TtlMap<K, Arc<DirectLimiter>>,
    quota: Quota,
    idle_ttl: Duration,
}

impl<K> std::fmt::Debug for KeyedRateLimiter<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedRateLimiter")
            .field("quota", &self.quota)
            .field("idle_ttl", &self.idle_ttl)
            .finish()
    }
}

impl<K> KeyedRateLimiter<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Creates a registry allowing `per_second` requests per client with
    /// bursts up to `burst`. Zero values are raised to one, and a zero
    /// `idle_ttl` to [`MIN_TTL`](crate::store::MIN_TTL).
    pub fn new(per_second: u32, burst: u32, idle_ttl: Duration) -> Self {
        let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);

        Self::with_quota(Quota::per_second(rate).allow_burst(burst), idle_ttl)
    }

    pub fn with_quota(quota: Quota, idle_ttl: Duration) -> Self {
        Self {
            limiters: TtlMap::new(),
            quota,
            idle_ttl: nonzero_ttl(idle_ttl),
        }
    }

    /// Physically frees idle limiters every `period` instead of leaving
    /// them to be replaced on the client's next request.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::MissingRuntime`](crate::CacheError::MissingRuntime)
    /// outside a Tokio runtime.
    pub fn with_sweep_interval(self, period: Duration) -> Result<Self> {
        self.limiters.enable_fixed_interval_sweep(move || period)?;
        Ok(self)
    }

    /// Decides whether the current request from `key` is allowed.
    ///
    /// The first request from a key creates its limiter; later requests
    /// reuse it and re-arm its idle timeout.
    pub fn check(&self, key: &K) -> bool {
        if let Some(limiter) = self.limiters.load(key) {
            self.limiters.touch(key, self.idle_ttl);
            return limiter.check().is_ok();
        }

        let fresh = Arc::new(GovernorLimiter::direct(self.quota));
        let (limiter, _) = self
            .limiters
            .load_or_store(key.clone(), fresh, self.idle_ttl);
        limiter.check().is_ok()
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}
