//! # Fibonacci Backoff
//!
//! Requeue delays for failed reconciliations. The delay grows along the
//! Fibonacci sequence, more slowly than exponential backoff, so a resource
//! that keeps failing on a transient dependency is retried often at first
//! without hammering the API server later on.
//!
//! With the default 5s minimum and 300s maximum the sequence is:
//! 5s, 5s, 10s, 15s, 25s, 40s, 65s, 105s, 170s, 275s, 300s (max).

use cluster_client::ObjectKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at the maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff in seconds (for reset)
    min_secs: u64,
    /// Previous backoff in seconds
    prev_secs: u64,
    /// Current backoff in seconds
    current_secs: u64,
    /// Maximum backoff in seconds
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff between `min` and `max`.
    ///
    /// Sub-second precision is dropped; a zero minimum is raised to one second.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_secs = min.as_secs().max(1);
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs: max.as_secs().max(min_secs),
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_secs;

        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next, self.max_secs);

        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}

/// Per-object backoff state, shared by the watcher's error policy.
///
/// Lives with the invocation substrate, not the reconciler: reconciliation
/// itself stays stateless.
#[derive(Debug)]
pub struct BackoffTracker {
    min: Duration,
    max: Duration,
    states: Mutex<HashMap<ObjectKey, FibonacciBackoff>>,
}

impl BackoffTracker {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Smallest delay the tracker hands out
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Delay before retrying `key` after another failure
    pub fn next_backoff(&self, key: &ObjectKey) -> Duration {
        match self.states.lock() {
            Ok(mut states) => states
                .entry(key.clone())
                .or_insert_with(|| FibonacciBackoff::new(self.min, self.max))
                .next_backoff(),
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                self.min
            }
        }
    }

    /// Forget the failure history of `key` after it reconciled successfully
    pub fn reset(&self, key: &ObjectKey) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(d: Duration) -> u64 {
        d.as_secs()
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(5), Duration::from_secs(300));

        let sequence: Vec<u64> = (0..11).map(|_| secs(backoff.next_backoff())).collect();
        assert_eq!(sequence, vec![5, 5, 10, 15, 25, 40, 65, 105, 170, 275, 300]);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(10));

        // 1, 1, 2, 3, 5, 8, 10 (max)
        for _ in 0..7 {
            backoff.next_backoff();
        }
        // Next would be 13 (8+5), but is capped
        assert_eq!(secs(backoff.next_backoff()), 10);
        assert_eq!(secs(backoff.next_backoff()), 10);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(10));

        assert_eq!(secs(backoff.next_backoff()), 1);
        assert_eq!(secs(backoff.next_backoff()), 1);
        assert_eq!(secs(backoff.next_backoff()), 2);
        assert_eq!(secs(backoff.next_backoff()), 3);

        backoff.reset();

        // Should restart from beginning after success
        assert_eq!(secs(backoff.next_backoff()), 1);
        assert_eq!(secs(backoff.next_backoff()), 1);
        assert_eq!(secs(backoff.next_backoff()), 2);
    }

    #[test]
    fn test_zero_minimum_is_raised() {
        let mut backoff = FibonacciBackoff::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(secs(backoff.next_backoff()), 1);
        assert_eq!(secs(backoff.next_backoff()), 1);
    }

    #[test]
    fn test_tracker_keeps_separate_sequences_per_object() {
        let tracker = BackoffTracker::new(Duration::from_secs(1), Duration::from_secs(10));
        let alpha = ObjectKey::new("monitoring", "alpha");
        let beta = ObjectKey::new("monitoring", "beta");

        assert_eq!(secs(tracker.next_backoff(&alpha)), 1);
        assert_eq!(secs(tracker.next_backoff(&alpha)), 1);
        assert_eq!(secs(tracker.next_backoff(&alpha)), 2);
        assert_eq!(secs(tracker.next_backoff(&beta)), 1);

        tracker.reset(&alpha);
        assert_eq!(secs(tracker.next_backoff(&alpha)), 1);
    }
}
