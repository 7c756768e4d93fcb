//! Brute-force lockout policy.
//!
//! Pure decision logic over the stored `login_attempts` and
//! `locked_until` fields. Unlocking is lazy: an expired lock is simply
//! reported as [`LockState::Active`], the stored counters are left for
//! the next successful login or an administrative unlock to clear.

use chrono::{DateTime, Duration, Utc};

use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Active,
    Locked { until: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_attempts: u32,
    duration: Duration,
}

impl LockoutPolicy {
    pub fn new(max_attempts: u32, duration: Duration) -> Self {
        Self {
            max_attempts,
            duration,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let secs = i64::try_from(config.lockout_duration_secs).unwrap_or(i64::MAX);
        Self::new(
            config.max_login_attempts,
            Duration::try_seconds(secs).unwrap_or(Duration::MAX),
        )
    }

    pub fn state(&self, locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LockState {
        match locked_until {
            Some(until) if until > now => LockState::Locked { until },
            _ => LockState::Active,
        }
    }

    /// Lock deadline to store after a failed attempt, given the attempt
    /// count *including* that failure.
    pub fn on_failure(&self, attempts_after: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.max_attempts == 0 || attempts_after < self.max_attempts {
            return None;
        }
        Some(now.checked_add_signed(self.duration).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(5, Duration::minutes(15))
    }

    #[test]
    fn locks_on_the_attempt_that_reaches_the_threshold() {
        let now = Utc::now();
        for attempts in 1..5 {
            assert_eq!(policy().on_failure(attempts, now), None);
        }
        assert_eq!(
            policy().on_failure(5, now),
            Some(now + Duration::minutes(15))
        );
        assert!(policy().on_failure(6, now).is_some());
    }

    #[test]
    fn future_deadline_is_locked_past_deadline_is_active() {
        let now = Utc::now();
        let until = now + Duration::seconds(1);
        assert_eq!(policy().state(Some(until), now), LockState::Locked { until });
        assert_eq!(
            policy().state(Some(now - Duration::seconds(1)), now),
            LockState::Active
        );
        assert_eq!(policy().state(Some(now), now), LockState::Active);
        assert_eq!(policy().state(None, now), LockState::Active);
    }

    #[test]
    fn zero_threshold_disables_lockout() {
        let policy = LockoutPolicy::new(0, Duration::minutes(15));
        assert_eq!(policy.on_failure(1_000, Utc::now()), None);
    }

    #[test]
    fn built_from_config_defaults() {
        let policy = LockoutPolicy::from_config(&AuthConfig::default());
        let now = Utc::now();
        assert_eq!(
            policy.on_failure(5, now),
            Some(now + Duration::seconds(900))
        );
    }
}
