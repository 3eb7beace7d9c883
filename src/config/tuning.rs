// ABOUTME: Retry and progress-polling tuning knobs.
// ABOUTME: Durations are written in humantime form (e.g. "1s", "500ms").

use serde::Deserialize;
use std::time::Duration;

/// Backoff for read-after-write retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_retry_delay(),
            max_attempts: default_max_attempts(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryConfig {
    /// Delay before attempt `attempt + 1`, doubling from the initial delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    10
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

/// Polling cadence of the deployment progress reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_progress_initial", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_progress_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_progress_initial(),
            interval: default_progress_interval(),
        }
    }
}

fn default_progress_initial() -> Duration {
    Duration::from_secs(3)
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(10)
}
