//! Exponential backoff with jitter and an elapsed-time cap
//!
//! `BackoffStrategy` is the stateless, serializable configuration;
//! `ExponentialBackoff` is the per-request timer started from it.

use std::time::Duration;

use graphload_core::{ClientError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Exponential backoff strategy for statement retries.
///
/// Delays grow by `multiplier` after every attempt, up to `max_ms`, and are
/// randomized by `randomization_factor` to keep workers from retrying in
/// lockstep. Once the time since the timer started would exceed
/// `max_elapsed_ms`, the timer stops producing delays.
///
/// # Example
///
/// ```
/// use graphload_client::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(2.0);
///
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(200));
///
/// // Capped at max
/// assert!(backoff.calculate_delay(20) <= Duration::from_millis(30_000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffStrategy {
    /// Delay in milliseconds before the first retry
    initial_ms: u64,
    /// Cap for exponential growth, in milliseconds
    max_ms: u64,
    /// Growth factor per attempt
    multiplier: f64,
    /// Jitter as a fraction of the delay, in `[0, 1]`
    randomization_factor: f64,
    /// Give up once this much time has passed; `None` retries forever
    max_elapsed_ms: Option<u64>,
}

impl BackoffStrategy {
    pub const DEFAULT_INITIAL_MS: u64 = 1_000;
    pub const DEFAULT_MAX_MS: u64 = 120_000;
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;
    pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.1;
    pub const DEFAULT_MAX_ELAPSED_MS: u64 = 3_600_000;

    /// Create a strategy with the given initial and maximum delays.
    ///
    /// Jitter is off; multiplier and elapsed cap take their defaults.
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: Self::DEFAULT_MULTIPLIER,
            randomization_factor: 0.0,
            max_elapsed_ms: Some(Self::DEFAULT_MAX_ELAPSED_MS),
        }
    }

    /// Set the multiplier for exponential growth (at least 1.0).
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Set the jitter fraction, clamped to `[0, 1]`. NaN disables jitter.
    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        self
    }

    /// Set the elapsed-time cap; `None` disables it.
    pub fn with_max_elapsed_ms(mut self, max_elapsed_ms: Option<u64>) -> Self {
        self.max_elapsed_ms = max_elapsed_ms;
        self
    }

    /// Check bounds that deserialization does not enforce.
    pub fn validate(&self) -> Result<()> {
        if self.initial_ms == 0 {
            return Err(ClientError::Configuration(
                "backoff initial_ms must be greater than 0".into(),
            ));
        }
        if self.max_ms < self.initial_ms {
            return Err(ClientError::Configuration(format!(
                "backoff max_ms ({}) must not be below initial_ms ({})",
                self.max_ms, self.initial_ms
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ClientError::Configuration(format!(
                "backoff multiplier must be a finite number >= 1, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(ClientError::Configuration(format!(
                "backoff randomization_factor must be within [0, 1], got {}",
                self.randomization_factor
            )));
        }
        Ok(())
    }

    /// Un-randomized delay before retry number `attempt` (zero-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_ms as f64) as u64;
        Duration::from_millis(capped_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn randomization_factor(&self) -> f64 {
        self.randomization_factor
    }

    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_ms.map(Duration::from_millis)
    }

    /// Start a timer for one request. Elapsed time counts from now.
    pub fn start(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current: self.initial_delay(),
            started_at: Instant::now(),
            strategy: self.clone(),
        }
    }
}

impl Default for BackoffStrategy {
    /// 1s initial, 1.5x growth, 10% jitter, 2 minute cap, 1 hour elapsed cap
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_MS, Self::DEFAULT_MAX_MS)
            .with_randomization_factor(Self::DEFAULT_RANDOMIZATION_FACTOR)
    }
}

/// Stateful backoff timer for a single request
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    strategy: BackoffStrategy,
    current: Duration,
    started_at: Instant,
}

impl ExponentialBackoff {
    /// Next delay to wait, or `None` once the elapsed-time cap would be exceeded.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let elapsed = self.elapsed();
        let delay = randomize(self.current, self.strategy.randomization_factor);
        self.increment();

        match self.strategy.max_elapsed() {
            Some(max_elapsed) if elapsed + delay > max_elapsed => None,
            _ => Some(delay),
        }
    }

    /// Time since the timer was started or last reset
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The un-randomized interval the next delay will be drawn around
    pub fn current_interval(&self) -> Duration {
        self.current
    }

    /// Restart from the initial interval and reset the elapsed clock
    pub fn reset(&mut self) {
        self.current = self.strategy.initial_delay();
        self.started_at = Instant::now();
    }

    fn increment(&mut self) {
        let max = self.strategy.max_delay();
        let next_nanos = self.current.as_nanos() as f64 * self.strategy.multiplier;
        self.current = if next_nanos >= max.as_nanos() as f64 {
            max
        } else {
            Duration::from_nanos(next_nanos as u64)
        };
    }
}

/// Draw uniformly from `[interval * (1 - factor), interval * (1 + factor)]`.
fn randomize(interval: Duration, factor: f64) -> Duration {
    if factor.is_nan() || factor <= 0.0 {
        return interval;
    }
    let nanos = interval.as_nanos() as f64;
    let delta = nanos * factor.min(1.0);
    let drawn = rand::thread_rng().gen_range((nanos - delta)..=(nanos + delta));
    Duration::from_nanos(drawn as u64)
}
