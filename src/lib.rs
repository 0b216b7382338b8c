//! ttlmap - Concurrent TTL key-value store
//!
//! A generic map with per-entry expiry, lazy or swept, and the primitives
//! built on it: a serialization-bridging cache, a per-client rate limiter
//! registry and an at-most-once-per-window dedup guard.

pub mod api;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod limiter;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cacher, TtlCache};
pub use config::Config;
pub use dedup::DedupGuard;
pub use error::{CacheError, Result};
pub use limiter::KeyedRateLimiter;
pub use store::{SweepMode, TtlMap};
