//! Politeness delay applied before every waterfall fetch.
//!
//! Each fetch call sleeps `delay + U[0, jitter]` before touching the network,
//! so requests never arrive at the origin in a tight, regular burst.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use bind_core::throttle::ThrottleConfig;
//!
//! // Sleep uniformly between 2 and 5 seconds.
//! let config = ThrottleConfig::new(Duration::from_secs(2))
//!     .with_jitter(Duration::from_secs(3));
//! assert_eq!(config, ThrottleConfig::default());
//! ```

use std::time::Duration;

/// Configuration for the politeness delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum delay before each fetch.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter]).
    pub jitter: Duration,
}

impl ThrottleConfig {
    /// Create a new config with the given delay and no jitter.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// No delay at all. Meant for tests and local demo servers.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Add random jitter (uniform [0, jitter]) on top of the base delay.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Compute the effective delay for a single wait (delay + random jitter).
    pub fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        self.delay + Duration::from_millis(fastrand::u64(0..=jitter_ms))
    }

    /// Sleep for one effective delay.
    pub async fn pause(&self) {
        let delay = self.effective_delay();
        if delay.is_zero() {
            return;
        }
        tracing::debug!(sleep_ms = %delay.as_millis(), "Politeness delay");
        tokio::time::sleep(delay).await;
    }
}

impl Default for ThrottleConfig {
    /// Uniform 2.0 to 5.0 seconds.
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            jitter: Duration::from_secs(3),
        }
    }
}
