//! Store Module
//!
//! Generic concurrent key-value storage where every entry expires after its
//! time-to-live. Dead entries are filtered lazily on read and, optionally,
//! swept by a background task.

mod entry;
mod map;


pub use entry::{nonzero_ttl, Entry, MIN_TTL};
pub use map::{SweepMode, TtlMap};
