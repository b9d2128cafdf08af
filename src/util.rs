//! # Misc utitlities
//!
//! This module contains some utilities that are used but not specific to `grace`.
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// A source of fresh identifiers
///
/// The embed bridge takes one of these instead of reaching for a global, so
/// that tests can pin down exactly which ids get handed out.
pub trait IdGenerator<T>: Send {
    /// Produce an id that was never returned by this generator before
    fn next_id(&mut self) -> T;
}

/// A counter that produces IDs of type T
#[derive(Debug)]
pub struct Counter<T>(u64, PhantomData<fn() -> T>);

impl<T> Default for Counter<T> {
    fn default() -> Self {
        Self(0, PhantomData)
    }
}

impl<T> Counter<T> {
    /// Start counting at `start` instead of zero
    pub fn starting_at(start: u64) -> Self {
        Self(start, PhantomData)
    }
}

impl<T: From<u64>> Counter<T> {
    /// Get the next value from this counter
    pub fn next(&mut self) -> T {
        let id = self.0;
        self.0 = id + 1;
        T::from(id)
    }
}

impl<T: From<u64>> IdGenerator<T> for Counter<T> {
    fn next_id(&mut self) -> T {
        self.next()
    }
}

static NEXT_SHARED: AtomicU64 = AtomicU64::new(0);

/// A counter that draws from one sequence for the whole process
///
/// Two `SharedCounter`s never return the same value, so callback servers
/// that share a document head should use this instead of [`Counter`].
#[derive(Debug)]
pub struct SharedCounter<T>(PhantomData<fn() -> T>);

impl<T> Default for SharedCounter<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: From<u64>> IdGenerator<T> for SharedCounter<T> {
    fn next_id(&mut self) -> T {
        T::from(NEXT_SHARED.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::{Counter, IdGenerator, SharedCounter};

    #[test]
    fn counter_is_monotonic() {
        let mut counter = Counter::<u64>::default();
        let ids: Vec<u64> = (0..4).map(|_| counter.next_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn counter_can_start_late() {
        let mut counter = Counter::<u64>::starting_at(41);
        assert_eq!(counter.next(), 41);
        assert_eq!(counter.next(), 42);
    }

    #[test]
    fn shared_counters_never_collide() {
        let mut a = SharedCounter::<u64>::default();
        let mut b = SharedCounter::<u64>::default();
        let first = a.next_id();
        let second = b.next_id();
        let third = a.next_id();
        assert!(first < second && second < third);
    }
}
