//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a store.
//!
//! # Tasks
//! - TTL Sweep: removes dead entries on a caller-defined cadence

mod sweeper;

pub use sweeper::{spawn_sweep_task, DelayFn, Sweep};
