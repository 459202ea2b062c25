//! Poll scheduling
//!
//! delay(n) = min(base * multiplier^(n / step), cap) + uniform(0..=jitter)

use cadence_foundation::PollingConfig;
use rand::Rng;
use std::time::Duration;

/// Stepped exponential backoff with additive jitter
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Interval used for the first `step` attempts (ms)
    pub base_ms: u64,

    /// Upper bound before jitter (ms)
    pub cap_ms: u64,

    /// Attempts per growth step
    pub step: u32,

    /// Growth factor applied once per step
    pub multiplier: f64,

    /// Maximum random delay added to every interval (ms)
    pub jitter_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            base_ms: config.base_interval_ms,
            cap_ms: config.max_interval_ms.max(config.base_interval_ms),
            step: config.backoff_step.max(1),
            multiplier: config.backoff_multiplier.max(1.0),
            jitter_ms: config.jitter_ms,
        }
    }

    /// Interval after `attempt` completed checks, without jitter
    pub fn interval(&self, attempt: u32) -> Duration {
        let exponent = (attempt / self.step).min(i32::MAX as u32) as i32;
        let grown = self.base_ms as f64 * self.multiplier.powi(exponent);
        let capped = grown.min(self.cap_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Interval plus jitter drawn from `rng`
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rng.gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        self.interval(attempt) + Duration::from_millis(jitter)
    }

    /// Delay before the next check
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }
}
