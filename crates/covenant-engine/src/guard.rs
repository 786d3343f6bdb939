//! Service-wide reentrancy guard.
//!
//! Every mutating entry point holds a [`GuardToken`] for its full duration.
//! Calls from other threads wait for the token; a call from the thread that
//! already holds it (an asset ledger calling back into the service while a
//! transfer is in flight) is rejected with
//! [`CovenantError::ReentrantCall`] instead of deadlocking or interleaving.

use std::cell::Cell;

use covenant_types::{CovenantError, Result};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Serializes mutating operations and rejects same-thread nesting.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    /// `true` while a token is alive.
    entered: ReentrantMutex<Cell<bool>>,
}

/// Proof that the holder is the only operation in flight.
///
/// Clears the in-flight flag when dropped, on success and error paths alike.
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken<'a> {
    entered: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section, blocking while another thread holds it.
    ///
    /// # Errors
    /// Returns [`CovenantError::ReentrantCall`] if the current thread is
    /// already inside.
    pub fn enter(&self) -> Result<GuardToken<'_>> {
        let entered = self.entered.lock();
        if entered.get() {
            return Err(CovenantError::ReentrantCall);
        }
        entered.set(true);
        Ok(GuardToken { entered })
    }

    /// Whether an operation is currently in flight on any thread.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.try_lock().is_none_or(|entered| entered.get())
    }
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.entered.set(false);
    }
}
