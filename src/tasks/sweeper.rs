//! Expiry Sweep Task
//!
//! Background task that periodically removes dead entries from a store.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Something a sweeper can purge of dead entries.
pub trait Sweep: Send + Sync + 'static {
    /// Removes every dead entry and returns how many were removed.
    fn sweep_expired(&self) -> usize;
}

/// Computes the delay before the next sweep pass.
///
/// Called once before every pass, so the first delay may differ from the
/// steady-state period.
pub type DelayFn = Box<dyn FnMut() -> Duration + Send + 'static>;

/// Spawns a background task that sweeps `target` on the cadence given by
/// `delay_fn`.
///
/// The task only holds a weak reference: it exits on its own once the target
/// has been dropped. The returned handle aborts it earlier.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_sweep_task<S: Sweep>(target: Weak<S>, mut delay_fn: DelayFn) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting fixed-interval sweep task");

        loop {
            let delay = delay_fn();
            tokio::time::sleep(delay).await;

            let Some(target) = target.upgrade() else {
                debug!("Sweep target dropped, stopping sweep task");
                break;
            };

            let removed = target.sweep_expired();
            drop(target);

            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter {
        passes: AtomicUsize,
    }

    impl Sweep for Counter {
        fn sweep_expired(&self) -> usize {
            self.passes.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    fn every(ms: u64) -> DelayFn {
        Box::new(move || Duration::from_millis(ms))
    }

    #[tokio::test]
    async fn test_sweep_task_runs_periodically() {
        let target = Arc::new(Counter::default());
        let handle = spawn_sweep_task(Arc::downgrade(&target), every(50));

        tokio::time::sleep(Duration::from_millis(275)).await;
        handle.abort();

        let passes = target.passes.load(Ordering::SeqCst);
        assert!(passes >= 3, "expected several passes, got {passes}");
    }

    #[tokio::test]
    async fn test_initial_delay_differs_from_period() {
        let target = Arc::new(Counter::default());
        let mut first = true;
        let delay: DelayFn = Box::new(move || {
            if std::mem::take(&mut first) {
                Duration::from_millis(300)
            } else {
                Duration::from_millis(20)
            }
        });
        let handle = spawn_sweep_task(Arc::downgrade(&target), delay);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(target.passes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(target.passes.load(Ordering::SeqCst) >= 2);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_stops_when_target_dropped() {
        let target = Arc::new(Counter::default());
        let handle = spawn_sweep_task(Arc::downgrade(&target), every(20));

        drop(target);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished(), "Task should exit once its target is gone");
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let target = Arc::new(Counter::default());
        let handle = spawn_sweep_task(Arc::downgrade(&target), every(1000));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
