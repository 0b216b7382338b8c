//! Store Entry Module
//!
//! Defines a single stored value together with its absolute expiry.

use std::time::{Duration, Instant};

/// TTL used in place of a zero TTL by types that fix one at construction.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Raises a zero `ttl` to [`MIN_TTL`].
pub fn nonzero_ttl(ttl: Duration) -> Duration {
    if ttl.is_zero() {
        MIN_TTL
    } else {
        ttl
    }
}

// == Entry ==
/// A stored value and the instant after which it is dead.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Monotonic instant at which the entry stops being live
    pub expires_at: Instant,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates an entry that is live for `ttl` from now.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: deadline(ttl),
        }
    }

    // == Liveness ==
    /// An entry is live while `now < expires_at`.
    #[inline]
    pub fn is_live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Checks liveness against the current instant.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.is_live_at(Instant::now())
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once dead.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Re-arms the expiry to `ttl` from now.
    pub fn refresh(&mut self, ttl: Duration) {
        self.expires_at = deadline(ttl);
    }
}

/// `now + ttl`, saturating far in the future instead of overflowing.
fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 60 * 60))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = Entry::new("test_value".to_string(), Duration::from_secs(60));

        assert_eq!(entry.value, "test_value");
        assert!(entry.is_live());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = Entry::new("test_value", Duration::from_millis(100));

        assert!(entry.is_live());

        sleep(Duration::from_millis(150));

        assert!(!entry.is_live());
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = Entry::new(1u32, Duration::from_secs(10));

        let remaining = entry.ttl_remaining();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));
    }

    #[test]
    fn test_ttl_remaining_expired() {
        let entry = Entry::new(1u32, Duration::from_millis(50));

        sleep(Duration::from_millis(100));

        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[test]
    fn test_refresh_extends_expiry() {
        let mut entry = Entry::new(1u32, Duration::from_millis(50));
        entry.refresh(Duration::from_secs(60));

        sleep(Duration::from_millis(100));

        assert!(entry.is_live());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = Entry {
            value: "test",
            expires_at: now,
        };

        assert!(!entry.is_live_at(now), "Entry should be dead at boundary");
        assert!(!entry.is_live());
    }

    #[test]
    fn test_nonzero_ttl() {
        assert_eq!(nonzero_ttl(Duration::ZERO), MIN_TTL);
        assert_eq!(nonzero_ttl(Duration::from_millis(5)), Duration::from_millis(5));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = Entry::new((), Duration::MAX);
        assert!(entry.is_live());
    }
}
