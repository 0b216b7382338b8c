//! Dedup Guard
//!
//! Lets exactly one caller per key act within a time window. Typical use is
//! delaying a token's expiry at most once every few minutes no matter how
//! many requests carry that token.

use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tracing::debug;

use crate::store::TtlMap;

/// At-most-once-per-window guard.
#[derive(Debug, Clone)]
pub struct DedupGuard<K> {
    seen: TtlMap<K, ()>,
    window: Duration,
}

impl<K> DedupGuard<K>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    pub fn new(window: Duration) -> Self {
        Self {
            seen: TtlMap::new(),
            window,
        }
    }

    /// Claims `key` for the current window.
    ///
    /// Returns `true` for exactly one caller per key per window, however
    /// many race. The window starts at the first claim and is not extended
    /// by later ones.
    pub fn try_acquire(&self, key: K) -> bool {
        let (_, loaded) = self.seen.load_or_store(key, (), self.window);
        !loaded
    }

    /// Whether `key` is claimed for the current window.
    pub fn is_claimed(&self, key: &K) -> bool {
        self.seen.load(key).is_some()
    }

    /// Ends the window for `key` early so the next trigger is allowed.
    pub fn release(&self, key: &K) {
        self.seen.delete(key);
    }

    /// Runs `side_effect` only if this call claims `key`.
    ///
    /// Returns `Ok(None)` when the side effect was suppressed. An error from
    /// the side effect is returned as-is and the claim is kept; call
    /// [`release`](Self::release) to allow a retry within the window.
    pub async fn run_once<F, Fut, T, E>(&self, key: K, side_effect: F) -> Result<Option<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire(key.clone()) {
            debug!("Suppressed duplicate trigger for {:?}", key);
            return Ok(None);
        }
        side_effect().await.map(Some)
    }
}
