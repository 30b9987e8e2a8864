// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Advisory deadlines and the shared stop flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Point in time after which long-running work should wind down.
///
/// `Deadline::NONE` never expires. Deadlines are advisory: work checks them
/// at chunk or batch boundaries and reports partial results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    pub const NONE: Self = Self(None);

    /// Expires at `instant`.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Expires `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    /// Expires `millis` from now; zero means no deadline.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::NONE
        } else {
            Self::after(Duration::from_millis(millis))
        }
    }

    /// The expiry instant, if any.
    #[must_use]
    pub const fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, or `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Stop flag shared by the workers of one scan.
///
/// Raised either explicitly or the first time any worker observes the
/// deadline as expired; once raised it stays raised.
#[derive(Debug, Default)]
pub struct StopSignal {
    raised: AtomicBool,
    deadline: Deadline,
}

impl StopSignal {
    /// Creates a signal bound to `deadline`.
    #[must_use]
    pub fn new(deadline: Deadline) -> Self {
        Self {
            raised: AtomicBool::new(false),
            deadline,
        }
    }

    /// Returns `true` if work should stop, raising the flag on expiry.
    pub fn should_stop(&self) -> bool {
        if self.raised.load(Ordering::Acquire) {
            return true;
        }
        if self.deadline.expired() {
            self.raise();
            return true;
        }
        false
    }

    /// Raises the flag.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Returns `true` if the flag has been raised.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_expires() {
        assert!(!Deadline::NONE.expired());
        assert_eq!(Deadline::NONE.remaining(), None);
        assert_eq!(Deadline::from_millis(0), Deadline::NONE);
    }

    #[test]
    fn past_deadline_raises_the_signal() {
        let signal = StopSignal::new(Deadline::at(Instant::now()));
        assert!(signal.should_stop());
        assert!(signal.is_raised());
    }

    #[test]
    fn future_deadline_keeps_running() {
        let signal = StopSignal::new(Deadline::after(Duration::from_secs(3600)));
        assert!(!signal.should_stop());
        signal.raise();
        assert!(signal.should_stop());
    }
}
