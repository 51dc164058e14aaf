//! # Access Arbiter
//!
//! Non-blocking arbitration over concurrent mapping sessions.

use core::sync::atomic::{AtomicU32, Ordering};

use peermem_core::{Error, Result};

// =============================================================================
// ACCESS ARBITER
// =============================================================================

/// Counts open mapping sessions against one region
///
/// A plain atomic counter, not a queue: a caller that finds every slot
/// taken gets [`Error::Busy`] immediately and may retry or give up, but is
/// never blocked. The shipped policy is exclusive access (one slot).
#[derive(Debug)]
pub struct AccessArbiter {
    /// Maximum concurrent sessions
    max_open: u32,
    /// Currently open sessions
    open_count: AtomicU32,
}

impl AccessArbiter {
    /// Arbiter allowing a single session at a time
    pub const fn exclusive() -> Self {
        Self::with_capacity(1)
    }

    /// Arbiter allowing up to `max_open` concurrent sessions
    pub const fn with_capacity(max_open: u32) -> Self {
        Self {
            max_open,
            open_count: AtomicU32::new(0),
        }
    }

    /// Claim a session slot
    ///
    /// Fails with [`Error::Busy`] when every slot is taken, without
    /// changing any state.
    pub fn try_acquire(&self) -> Result<()> {
        let mut current = self.open_count.load(Ordering::Acquire);
        loop {
            if current >= self.max_open {
                return Err(Error::Busy);
            }
            match self.open_count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }

    /// Return a session slot
    ///
    /// Must be called exactly once per successful
    /// [`try_acquire`](Self::try_acquire).
    pub fn release(&self) {
        let prev = self.open_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev != 0, "arbiter release without acquire");
    }

    /// Currently open sessions
    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::Acquire)
    }

    /// Maximum concurrent sessions
    pub const fn capacity(&self) -> u32 {
        self.max_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_rejects_second_open() {
        let arbiter = AccessArbiter::exclusive();
        arbiter.try_acquire().unwrap();
        assert_eq!(arbiter.try_acquire(), Err(Error::Busy));
        assert_eq!(arbiter.open_count(), 1);
    }

    #[test]
    fn test_release_frees_the_slot() {
        let arbiter = AccessArbiter::exclusive();
        arbiter.try_acquire().unwrap();
        arbiter.release();
        assert_eq!(arbiter.open_count(), 0);
        arbiter.try_acquire().unwrap();
    }

    #[test]
    fn test_capacity_above_one() {
        let arbiter = AccessArbiter::with_capacity(2);
        arbiter.try_acquire().unwrap();
        arbiter.try_acquire().unwrap();
        assert_eq!(arbiter.try_acquire(), Err(Error::Busy));
        assert_eq!(arbiter.open_count(), 2);
        assert_eq!(arbiter.capacity(), 2);
    }
}
