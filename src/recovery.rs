use std::time::Duration;
use tracing::debug;

/// Retry policy for reconnect attempts
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure past the degraded threshold
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Whether to double the delay on each attempt
    pub exponential_backoff: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_backoff: true,
        }
    }
}

/// Tracks consecutive failures of one connection and the delay before the
/// next attempt
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempts: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config, attempts: 0 }
    }

    /// Record a failure and return the delay to wait before retrying
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.calculate_delay(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        debug!("Backoff attempt {} -> {:?}", self.attempts, delay);
        delay
    }

    /// Delay for the given retry count with exponential backoff
    fn calculate_delay(&self, retry_count: u32) -> Duration {
        if !self.config.exponential_backoff {
            return self.config.base_delay;
        }

        // 2^31 already exceeds any sane cap
        let factor = 2u32.saturating_pow(retry_count.min(31));
        self.config
            .base_delay
            .checked_mul(factor)
            .map_or(self.config.max_delay, |delay| delay.min(self.config.max_delay))
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Forget past failures after a successful connection
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
