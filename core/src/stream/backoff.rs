use std::time::Duration;

use super::config::StreamConfig;

/// Bounded retry counter with capped exponential delays.
///
/// The k-th retry after a run of failures waits `min(base * 2^(k-1), max)`.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    attempt: u32,
    max_attempts: u32,
    base: Duration,
    max: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base,
            max,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay, config.max_delay)
    }

    /// Delay before the retry that follows `attempt` earlier retries
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Consume one attempt; `None` once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
