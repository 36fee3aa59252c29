//! Failed-login lockout state machine.
//!
//! Each user is either Active or Locked. Consecutive failures that land within
//! `window` of the previous failure accumulate; a failure after a quiet period
//! restarts the streak at 1. Reaching `threshold` locks the account. A lock is
//! released by a successful password reset, by an explicit unlock, or, when
//! `unlock_after` is set, once that long has passed since the last failure.
//!
//! The tracker is pure: it takes the persisted [`LockoutState`] and the current
//! time and returns the next state. Persisting it is the caller's job.

use super::models::LockoutState;
use chrono::{DateTime, Duration, Utc};

/// Default consecutive failures before locking
pub const DEFAULT_LOCK_THRESHOLD: u32 = 5;

/// Default window in which failures accumulate (seconds)
pub const DEFAULT_LOCK_WINDOW_SECS: i64 = 120;

/// Default automatic unlock delay (seconds)
pub const DEFAULT_UNLOCK_AFTER_SECS: i64 = 900;

/// Lockout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failures within the window needed to lock
    pub threshold: u32,

    /// Maximum gap between failures for them to count as one streak
    pub window: Duration,

    /// Automatic unlock delay after the last failure; `None` keeps the lock
    /// until a reset or an explicit unlock
    pub unlock_after: Option<Duration>,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOCK_THRESHOLD,
            window: Duration::seconds(DEFAULT_LOCK_WINDOW_SECS),
            unlock_after: Some(Duration::seconds(DEFAULT_UNLOCK_AFTER_SECS)),
        }
    }
}

/// Outcome of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still active; `remaining` failures before a lock
    Active { remaining: u32 },

    /// This failure locked the account
    Locked,
}

/// Lockout state machine
#[derive(Debug, Clone, Copy, Default)]
pub struct LockoutTracker {
    policy: LockoutPolicy,
}

impl LockoutTracker {
    pub fn new(policy: LockoutPolicy) -> Self {
        Self { policy }
    }

    /// Whether the lock has outlived `unlock_after`.
    fn lock_expired(&self, state: &LockoutState, now: DateTime<Utc>) -> bool {
        match (self.policy.unlock_after, state.last_failure_at) {
            (Some(unlock_after), Some(last)) => now - last >= unlock_after,
            _ => false,
        }
    }

    /// Whether login attempts must be rejected right now.
    pub fn is_locked(&self, state: &LockoutState, now: DateTime<Utc>) -> bool {
        state.locked && !self.lock_expired(state, now)
    }

    /// Drop an expired lock and its history. Returns `None` when nothing changes.
    pub fn release_expired(&self, state: &LockoutState, now: DateTime<Utc>) -> Option<LockoutState> {
        (state.locked && self.lock_expired(state, now)).then(LockoutState::cleared)
    }

    /// Apply a failed credential check.
    pub fn record_failure(
        &self,
        state: &LockoutState,
        now: DateTime<Utc>,
    ) -> (LockoutState, FailureOutcome) {
        let in_window = state
            .last_failure_at
            .is_some_and(|last| now - last < self.policy.window);

        let failed_attempt_count = if in_window {
            state.failed_attempt_count.saturating_add(1)
        } else {
            1
        };

        let locked = failed_attempt_count >= self.policy.threshold;
        let next = LockoutState {
            failed_attempt_count,
            last_failure_at: Some(now),
            locked,
        };

        let outcome = if locked {
            FailureOutcome::Locked
        } else {
            FailureOutcome::Active {
                remaining: self.policy.threshold - failed_attempt_count,
            }
        };

        (next, outcome)
    }

    /// Apply a successful credential check. Returns `None` when the state is
    /// already clear, so callers can skip the write.
    pub fn record_success(&self, state: &LockoutState) -> Option<LockoutState> {
        (*state != LockoutState::cleared()).then(LockoutState::cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LockoutTracker {
        LockoutTracker::new(LockoutPolicy::default())
    }

    fn fail_times(tracker: &LockoutTracker, start: DateTime<Utc>, n: u32, gap: Duration) -> LockoutState {
        let mut state = LockoutState::cleared();
        for i in 0..n {
            let (next, _) = tracker.record_failure(&state, start + gap * i as i32);
            state = next;
        }
        state
    }

    #[test]
    fn test_five_failures_within_window_lock() {
        let tracker = tracker();
        let start = Utc::now();

        let state = fail_times(&tracker, start, 4, Duration::seconds(10));
        assert_eq!(state.failed_attempt_count, 4);
        assert!(!state.locked);

        let (state, outcome) = tracker.record_failure(&state, start + Duration::seconds(50));
        assert_eq!(outcome, FailureOutcome::Locked);
        assert!(state.locked);
        assert!(tracker.is_locked(&state, start + Duration::seconds(51)));
    }

    #[test]
    fn test_remaining_counts_down() {
        let tracker = tracker();
        let (state, outcome) = tracker.record_failure(&LockoutState::cleared(), Utc::now());
        assert_eq!(state.failed_attempt_count, 1);
        assert_eq!(outcome, FailureOutcome::Active { remaining: 4 });
    }

    #[test]
    fn test_failure_after_window_restarts_streak() {
        let tracker = tracker();
        let start = Utc::now();

        let state = fail_times(&tracker, start, 4, Duration::seconds(1));
        let (state, outcome) = tracker.record_failure(&state, start + Duration::seconds(3 + 121));

        assert_eq!(state.failed_attempt_count, 1);
        assert!(!state.locked);
        assert_eq!(outcome, FailureOutcome::Active { remaining: 4 });
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let tracker = tracker();
        let start = Utc::now();
        let (state, _) = tracker.record_failure(&LockoutState::cleared(), start);

        let (state, _) = tracker.record_failure(&state, start + Duration::seconds(120));
        assert_eq!(state.failed_attempt_count, 1);
    }

    #[test]
    fn test_success_clears_counter() {
        let tracker = tracker();
        let state = fail_times(&tracker, Utc::now(), 3, Duration::seconds(1));

        assert_eq!(tracker.record_success(&state), Some(LockoutState::cleared()));
        assert_eq!(tracker.record_success(&LockoutState::cleared()), None);
    }

    #[test]
    fn test_lock_expires_after_unlock_delay() {
        let tracker = tracker();
        let start = Utc::now();
        let state = fail_times(&tracker, start, 5, Duration::seconds(1));
        let last = start + Duration::seconds(4);

        assert!(tracker.is_locked(&state, last + Duration::seconds(899)));
        assert!(tracker.release_expired(&state, last + Duration::seconds(899)).is_none());

        assert!(!tracker.is_locked(&state, last + Duration::seconds(900)));
        assert_eq!(
            tracker.release_expired(&state, last + Duration::seconds(900)),
            Some(LockoutState::cleared())
        );
    }

    #[test]
    fn test_permanent_lock_without_unlock_delay() {
        let tracker = LockoutTracker::new(LockoutPolicy {
            unlock_after: None,
            ..LockoutPolicy::default()
        });
        let start = Utc::now();
        let state = fail_times(&tracker, start, 5, Duration::seconds(1));

        assert!(tracker.is_locked(&state, start + Duration::days(365)));
        assert!(tracker.release_expired(&state, start + Duration::days(365)).is_none());
    }
}
