//! Cooperative, thread-local deadline.
//!
//! At most one deadline can be armed per thread. Arming returns a guard that
//! releases the slot when dropped, so the slot is freed on every exit path,
//! including early returns carrying [`SolverError::DeadlineReached`].
//!
//! Hot loops do not read the clock on every iteration; they hold a [`Ticker`]
//! and only consult the clock once every few ticks.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use ssipp::deadline;
//!
//! let finished = deadline::run_for(Duration::from_secs(5), || {
//!     deadline::check()?;
//!     Ok(())
//! })
//! .unwrap();
//! assert!(finished);
//! assert!(!deadline::is_armed());
//! ```

use crate::error::{Result, SolverError};
use std::cell::Cell;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

/// Number of ticks between two clock reads.
pub const DEFAULT_TICK_INTERVAL: usize = 100;

#[derive(Clone, Copy)]
enum Slot {
    Free,
    // `None` means armed with a budget too large to represent.
    Armed(Option<Instant>),
}

thread_local! {
    static SLOT: Cell<Slot> = const { Cell::new(Slot::Free) };
}

/// Scoped ownership of the armed deadline. Dropping it disarms.
#[must_use = "the deadline is released as soon as the guard is dropped"]
pub struct DeadlineGuard {
    expires_at: Option<Instant>,
    // Tied to the thread that armed it.
    _not_send: PhantomData<*const ()>,
}

impl DeadlineGuard {
    /// Time left before expiry, `None` when the budget is unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        SLOT.with(|slot| slot.set(Slot::Free));
    }
}

/// Arms the deadline `budget` from now.
///
/// # Panics
///
/// Panics if a deadline is already armed on this thread.
pub fn arm(budget: Duration) -> DeadlineGuard {
    SLOT.with(|slot| {
        assert!(
            matches!(slot.get(), Slot::Free),
            "a deadline is already armed on this thread"
        );
        let expires_at = Instant::now().checked_add(budget);
        slot.set(Slot::Armed(expires_at));
        DeadlineGuard {
            expires_at,
            _not_send: PhantomData,
        }
    })
}

/// Whether a deadline is currently armed on this thread.
pub fn is_armed() -> bool {
    SLOT.with(|slot| matches!(slot.get(), Slot::Armed(_)))
}

/// Returns `Err(DeadlineReached)` once the armed deadline has expired.
/// Always succeeds when nothing is armed.
pub fn check() -> Result<()> {
    let expired = SLOT.with(|slot| match slot.get() {
        Slot::Armed(Some(at)) => Instant::now() >= at,
        _ => false,
    });
    if expired {
        Err(SolverError::DeadlineReached)
    } else {
        Ok(())
    }
}

/// Counter that reads the clock once every `every` ticks.
#[derive(Debug, Clone)]
pub struct Ticker {
    count: usize,
    every: usize,
}

impl Ticker {
    pub fn new(every: usize) -> Self {
        Self {
            count: 0,
            every: every.max(1),
        }
    }

    pub fn tick(&mut self) -> Result<()> {
        self.count += 1;
        if self.count >= self.every {
            self.count = 0;
            check()
        } else {
            Ok(())
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

/// Runs `f` under a deadline of `budget`.
///
/// Returns `Ok(true)` if `f` completed, `Ok(false)` if it was cut short by the
/// deadline, and propagates any other error.
pub fn run_for<F>(budget: Duration, f: F) -> Result<bool>
where
    F: FnOnce() -> Result<()>,
{
    let _guard = arm(budget);
    match f() {
        Ok(()) => Ok(true),
        Err(SolverError::DeadlineReached) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_slot() {
        {
            let _guard = arm(Duration::from_secs(60));
            assert!(is_armed());
            assert!(check().is_ok());
        }
        assert!(!is_armed());
    }

    #[test]
    #[should_panic(expected = "already armed")]
    fn test_double_arm_panics() {
        let _a = arm(Duration::from_secs(60));
        let _b = arm(Duration::from_secs(60));
    }

    #[test]
    fn test_expired_deadline_is_reported() {
        let _guard = arm(Duration::ZERO);
        assert_eq!(check(), Err(SolverError::DeadlineReached));
    }

    #[test]
    fn test_run_for_absorbs_deadline() {
        let finished = run_for(Duration::ZERO, || {
            let mut ticker = Ticker::new(1);
            loop {
                ticker.tick()?;
            }
        })
        .unwrap();
        assert!(!finished);
        assert!(!is_armed());
    }

    #[test]
    fn test_run_for_propagates_other_errors() {
        let res = run_for(Duration::from_secs(60), || {
            Err(SolverError::invalid_config("bad"))
        });
        assert!(matches!(res, Err(SolverError::InvalidConfig(_))));
        assert!(!is_armed());
    }

    #[test]
    fn test_huge_budget_never_expires() {
        let guard = arm(Duration::MAX);
        assert!(guard.remaining().is_none());
        assert!(check().is_ok());
    }

    #[test]
    fn test_ticker_checks_only_periodically() {
        let _guard = arm(Duration::ZERO);
        let mut ticker = Ticker::new(3);
        assert!(ticker.tick().is_ok());
        assert!(ticker.tick().is_ok());
        assert!(ticker.tick().is_err());
    }
}
