//! Bounded retry with a hard attempt cap.
//!
//! The caller performs an attempt (apply a loadout, move an actor), waits,
//! then reports whether it verified. The combinator answers with the next
//! step. It never allows more than `max_attempts` attempts in total.
//!
//! ```text
//!   attempt 1 ──wait first_delay──► check ─ ok ─► Verified
//!                                    │ fail, attempts < max
//!                                    ▼
//!   attempt n ──wait interval─────► check ─ fail, attempts == max ─► Exhausted
//! ```

use stakematch_types::Ticks;

/// What to do after a verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// The attempt succeeded.
    Verified,
    /// Perform another attempt, then check again after this delay.
    RetryAfter(Ticks),
    /// The cap was reached without success.
    Exhausted { attempts: u32 },
}

/// Attempt counter for one verify-and-retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedRetry {
    max_attempts: u32,
    first_delay: Ticks,
    interval: Ticks,
    attempts: u32,
}

impl BoundedRetry {
    /// A loop whose first attempt has just been made.
    #[must_use]
    pub fn started(max_attempts: u32, first_delay: Ticks, interval: Ticks) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            first_delay,
            interval,
            attempts: 1,
        }
    }

    /// A loop that has already made `attempts` attempts. Used when the
    /// counter lives elsewhere (e.g. inside a phase value).
    #[must_use]
    pub fn resumed(max_attempts: u32, interval: Ticks, attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            first_delay: interval,
            interval,
            attempts: attempts.max(1),
        }
    }

    /// Delay between the first attempt and its check.
    #[must_use]
    pub fn first_delay(&self) -> Ticks {
        self.first_delay
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record the outcome of the latest check.
    ///
    /// On `RetryAfter` the attempt counter has already been bumped; the
    /// caller must perform the attempt before the next check.
    pub fn check(&mut self, verified: bool) -> RetryStep {
        if verified {
            return RetryStep::Verified;
        }
        if self.attempts >= self.max_attempts {
            return RetryStep::Exhausted {
                attempts: self.attempts,
            };
        }
        self.attempts += 1;
        RetryStep::RetryAfter(self.interval)
    }
}
