//! Exponential back-off schedule for LLM calls.

use std::time::Duration;

use crate::RetryPolicy;

/// Longest wait a provider's retry hint can impose by default.
pub const DEFAULT_MAX_HINT: Duration = Duration::from_secs(60);

/// Bounded attempt count with `base * 2^attempt` back-off.
///
/// Attempts are numbered from zero. With the defaults (3 attempts, 1 second
/// base) a call that keeps failing waits 1 s after attempt 0 and 2 s after
/// attempt 1, then gives up after attempt 2. Provider hints are capped at
/// `max_hint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    max_attempts: u32,
    base_delay: Duration,
    max_hint: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_hint: DEFAULT_MAX_HINT,
        }
    }
}

impl RetrySchedule {
    /// Creates a schedule, returning `None` if `max_attempts` is zero.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Option<Self> {
        (max_attempts > 0).then_some(Self {
            max_attempts,
            base_delay,
            max_hint: DEFAULT_MAX_HINT,
        })
    }

    /// Caps provider retry hints at `max_hint` instead of the default.
    #[must_use]
    pub fn with_max_hint(mut self, max_hint: Duration) -> Self {
        self.max_hint = max_hint;
        self
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(self) -> u32 {
        self.max_attempts
    }

    /// Returns `true` if another attempt may follow the failed `attempt`.
    pub fn has_attempt_after(self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    /// Back-off after the failed `attempt`: `base * 2^attempt`, saturating.
    pub fn backoff(self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay before the attempt following `attempt`, honouring a provider's
    /// minimum-delay hint when it is longer than the back-off. The hint is
    /// clamped to `max_hint`.
    pub fn delay_after(self, attempt: u32, policy: &RetryPolicy) -> Duration {
        let backoff = self.backoff(attempt);
        match policy {
            RetryPolicy::Retryable { after: Some(hint) } => {
                backoff.max((*hint).min(self.max_hint))
            }
            _ => backoff,
        }
    }
}
