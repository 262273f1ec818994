//! Listener identifiers and the counter that hands them out.
//!
//! Both the channel and the local event sink need a way to name "this one
//! registration" so it can later be removed without touching any other
//! listener for the same event.  Closures cannot be compared for equality in
//! Rust, so every registration is tagged with a [`ListenerId`] instead.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU64` internally, so adapters that share one
//! counter across handles never hand out the same id twice.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one registration against a channel or an event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A thread-safe, monotonically increasing source of [`ListenerId`]s.
///
/// # Examples
///
/// ```rust
/// use framebus_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next().0, 0);
/// assert_eq!(counter.next().0, 1);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next id and atomically advances the counter.
    ///
    /// Wraps from `u64::MAX` to 0 without panicking.  `Relaxed` ordering is
    /// enough: ids only need to be unique, not to order other memory.
    pub fn next(&self) -> ListenerId {
        ListenerId(self.inner.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the value the next call to [`next`](Self::next) will hand out.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequence_counter_starts_at_zero() {
        // Arrange
        let counter = SequenceCounter::new();

        // Act
        let first = counter.next();

        // Assert
        assert_eq!(first, ListenerId(0));
    }

    #[test]
    fn test_sequence_counter_wraps_at_u64_max() {
        // Arrange – start the counter one step before overflow
        let counter = SequenceCounter {
            inner: AtomicU64::new(u64::MAX),
        };

        // Act
        let before_wrap = counter.next();
        let after_wrap = counter.next();

        // Assert
        assert_eq!(before_wrap, ListenerId(u64::MAX));
        assert_eq!(after_wrap, ListenerId(0), "counter must wrap to 0 after u64::MAX");
    }

    #[test]
    fn test_ids_are_unique_across_threads() {
        // Arrange
        let counter = Arc::new(SequenceCounter::new());

        // Act – hand out ids from several threads at once
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || (0..250).map(|_| c.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut ids: Vec<ListenerId> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_current_does_not_advance() {
        let counter = SequenceCounter::new();
        counter.next();
        assert_eq!(counter.current(), 1);
        assert_eq!(counter.next(), ListenerId(1));
    }

    #[test]
    fn test_listener_id_display() {
        assert_eq!(ListenerId(7).to_string(), "listener#7");
    }
}
