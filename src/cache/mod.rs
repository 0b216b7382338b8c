//! Cache Module
//!
//! Serialization-bridging cache over a single TTL store. Values of any
//! serializable type go in; reads recover them as whatever type the caller
//! asks for.

mod stats;
mod ttl_cache;
mod value;

pub use stats::CacheStats;
pub use ttl_cache::{Cacher, TtlCache};
pub use value::{CacheValue, ErasedValue};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
