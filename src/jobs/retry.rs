//! Bounded retry as an explicit state machine.
//!
//! `Attempting(n)` moves to `Succeeded` on a passing attempt, to
//! `Attempting(n + 1)` on a failure with attempts left, and to `Exhausted`
//! once `max_attempts` failures have been seen.

use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::jobs::probe::ProbeFailure;

/// Longest wait between two attempts, whatever the backoff computes.
pub const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Delay between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { initial: Duration, multiplier: f64 },
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based),
    /// saturating at [`MAX_BACKOFF`].
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay.min(MAX_BACKOFF),
            Backoff::Exponential { initial, .. } if initial.is_zero() => Duration::ZERO,
            Backoff::Exponential {
                initial,
                multiplier,
            } => {
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                Duration::try_from_secs_f64(secs)
                    .unwrap_or(MAX_BACKOFF)
                    .min(MAX_BACKOFF)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A single attempt, used by ad-hoc probes
    pub fn once() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        let backoff = if config.retry_backoff_multiplier > 1.0 {
            Backoff::Exponential {
                initial: config.retry_delay(),
                multiplier: config.retry_backoff_multiplier,
            }
        } else {
            Backoff::Fixed(config.retry_delay())
        };
        Self::new(config.max_attempts, backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Attempting(u32),
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32, last_failure: ProbeFailure },
}

impl AttemptState {
    pub fn start() -> Self {
        AttemptState::Attempting(1)
    }

    /// Feeds the result of the current attempt. Terminal states stay put.
    pub fn advance(self, result: Result<(), ProbeFailure>, policy: &RetryPolicy) -> Self {
        match (self, result) {
            (AttemptState::Attempting(n), Ok(())) => AttemptState::Succeeded { attempts: n },
            (AttemptState::Attempting(n), Err(failure)) if n >= policy.max_attempts => {
                AttemptState::Exhausted {
                    attempts: n,
                    last_failure: failure,
                }
            }
            (AttemptState::Attempting(n), Err(_)) => AttemptState::Attempting(n + 1),
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptState::Attempting(_))
    }
}

/// Result of one full dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32, last_failure: ProbeFailure },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DispatchOutcome::Succeeded { attempts } | DispatchOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> ProbeFailure {
        ProbeFailure::Failed {
            status: Some(500),
            reason: "boom".to_string(),
        }
    }

    #[test]
    fn test_success_on_first_attempt() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::ZERO));
        let state = AttemptState::start().advance(Ok(()), &policy);
        assert_eq!(state, AttemptState::Succeeded { attempts: 1 });
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::ZERO));
        let mut state = AttemptState::start();
        let mut steps = 0;
        while !state.is_terminal() {
            state = state.advance(Err(failure()), &policy);
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(
            state,
            AttemptState::Exhausted {
                attempts: 3,
                last_failure: failure()
            }
        );
    }

    #[test]
    fn test_recovers_on_later_attempt() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::ZERO));
        let state = AttemptState::start()
            .advance(Err(failure()), &policy)
            .advance(Ok(()), &policy);
        assert_eq!(state, AttemptState::Succeeded { attempts: 2 });
    }

    #[test]
    fn test_terminal_state_ignores_input() {
        let policy = RetryPolicy::once();
        let done = AttemptState::Succeeded { attempts: 1 };
        assert_eq!(done.clone().advance(Err(failure()), &policy), done);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let policy = RetryPolicy::new(0, Backoff::Fixed(Duration::ZERO));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(100),
            multiplier: 2.0,
        };
        assert_eq!(backoff.delay_after(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_after(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(1),
            multiplier: 10.0,
        };
        assert_eq!(backoff.delay_after(25), MAX_BACKOFF);
        assert_eq!(backoff.delay_after(u32::MAX), MAX_BACKOFF);

        let immediate = Backoff::Exponential {
            initial: Duration::ZERO,
            multiplier: 10.0,
        };
        assert_eq!(immediate.delay_after(u32::MAX), Duration::ZERO);
        assert_eq!(
            Backoff::Fixed(Duration::from_secs(86_400)).delay_after(1),
            MAX_BACKOFF
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = SchedulerConfig {
            max_attempts: 4,
            retry_delay_ms: 50,
            retry_backoff_multiplier: 1.0,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_millis(50)));

        let default = RetryPolicy::default();
        assert_eq!(default.max_attempts, 3);
    }
}
