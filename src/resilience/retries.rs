//! Retry logic for connection acquisition.
//!
//! # Responsibilities
//! - Hold the attempt budget and the fixed inter-attempt delay
//! - Track the current attempt of one acquisition as an explicit state
//! - Decide, after a failure, whether to wait and retry or stop
//!
//! # Design Decisions
//! - Fixed delay, not exponential: worst-case latency is
//!   `(max_attempts - 1) × delay` plus the per-attempt timeouts
//! - No delay after the final attempt
//! - The state is local to one `acquire()` call and dropped afterwards

use std::time::Duration;

use crate::config::RetryConfig;

/// Bounded retry policy with a constant delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A budget of zero attempts is raised to one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total time spent sleeping when every attempt fails.
    pub fn worst_case_delay(&self) -> Duration {
        self.delay.saturating_mul(self.max_attempts - 1)
    }

    /// Begin a new attempt sequence at attempt 1.
    pub fn start(&self) -> RetryState {
        RetryState {
            attempt: 1,
            max_attempts: self.max_attempts,
            delay: self.delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Sleep for the delay, then make the attempt now reported by the state.
    RetryAfter(Duration),
    /// The budget is spent.
    Exhausted,
}

/// Attempt counter for one acquisition.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
}

impl RetryState {
    /// Current attempt number, 1-based.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_final(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Record a failure of the current attempt.
    pub fn on_failure(&mut self) -> NextStep {
        if self.is_final() {
            NextStep::Exhausted
        } else {
            self.attempt += 1;
            NextStep::RetryAfter(self.delay)
        }
    }
}
