//! Circuit breaker guarding the origin site.
//!
//! Stops the harvester from hammering a site that is actively blocking it.
//! Every fetch call that fails on all transport layers counts as one failure;
//! once the threshold is reached the circuit opens and all fetches are refused
//! until the cooldown has elapsed since the last failure.
//!
//! # Circuit States
//!
//! ```text
//! CLOSED --[threshold failures]--> OPEN --[can_attempt() after cooldown]--> CLOSED
//!    ^                              |
//!    +---------[success]------------+
//! ```
//!
//! There is no half-open probe state: the `can_attempt()` check that observes
//! the elapsed cooldown closes the circuit and clears the failure count itself.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::AppError;

/// Environment variable overriding the failure threshold.
pub const THRESHOLD_ENV: &str = "CIRCUIT_BREAKER_THRESHOLD";
/// Environment variable overriding the cooldown, in seconds.
pub const COOLDOWN_ENV: &str = "CIRCUIT_BREAKER_COOLDOWN";

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Current state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed - requests flow normally.
    Closed,
    /// Circuit is open - requests are rejected immediately.
    Open,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
        }
    }
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failed fetch calls before opening the circuit.
    pub failure_threshold: u32,

    /// Time since the last failure after which an open circuit may close again.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl CircuitBreakerConfig {
    /// Resolve the configuration from explicit values and the process environment.
    ///
    /// Precedence per field: explicit value > environment variable > default.
    pub fn resolve(
        failure_threshold: Option<u32>,
        cooldown: Option<Duration>,
    ) -> Result<Self, AppError> {
        Self::resolve_with(failure_threshold, cooldown, |key| std::env::var(key).ok())
    }

    /// Same as [`resolve`](Self::resolve), reading variables through `lookup`.
    pub fn resolve_with(
        failure_threshold: Option<u32>,
        cooldown: Option<Duration>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let failure_threshold = match failure_threshold {
            Some(value) => value,
            None => match lookup(THRESHOLD_ENV) {
                None => DEFAULT_FAILURE_THRESHOLD,
                Some(raw) => raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid {THRESHOLD_ENV} '{raw}': must be a positive integer"
                    ))
                })?,
            },
        };
        if failure_threshold == 0 {
            return Err(AppError::ConfigError(
                "Circuit breaker threshold must be at least 1".into(),
            ));
        }

        let cooldown = match cooldown {
            Some(value) => value,
            None => match lookup(COOLDOWN_ENV) {
                None => DEFAULT_COOLDOWN,
                Some(raw) => raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .ok_or_else(|| {
                        AppError::ConfigError(format!(
                            "Invalid {COOLDOWN_ENV} '{raw}': must be a non-negative number of seconds"
                        ))
                    })?,
            },
        };

        Ok(Self {
            failure_threshold,
            cooldown,
        })
    }
}

#[derive(Debug, Default)]
struct CircuitBreakerInner {
    failure_count: u32,
    last_failure_time: Option<Instant>,
    is_open: bool,
}

/// Process-local circuit breaker for the fetch waterfall.
///
/// Cloning shares the underlying state. Nothing is synchronised across
/// processes: every daemon instance trips and recovers on its own.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<CircuitBreakerInner>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Arc::new(Mutex::new(CircuitBreakerInner::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, CircuitBreakerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(circuit = %self.name, "Recovered from poisoned mutex");
            poisoned.into_inner()
        })
    }

    /// Returns whether the circuit is currently open, without any transition.
    pub fn is_open(&self) -> bool {
        self.lock_inner().is_open
    }

    pub fn state(&self) -> CircuitState {
        if self.is_open() {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.lock_inner().failure_count
    }

    /// Remaining cooldown while the circuit is open, `None` when closed.
    pub fn time_until_retry(&self) -> Option<Duration> {
        let inner = self.lock_inner();
        if !inner.is_open {
            return None;
        }
        inner
            .last_failure_time
            .map(|t| self.config.cooldown.saturating_sub(t.elapsed()))
    }

    /// Closes the circuit and clears the failure count.
    pub fn record_success(&self) {
        let mut inner = self.lock_inner();
        if inner.is_open {
            tracing::info!(circuit = %self.name, "Circuit breaker closed by successful fetch");
        }
        inner.failure_count = 0;
        inner.is_open = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock_inner();
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        if inner.failure_count >= self.config.failure_threshold {
            if !inner.is_open {
                tracing::warn!(
                    circuit = %self.name,
                    failures = inner.failure_count,
                    cooldown_secs = self.config.cooldown.as_secs_f64(),
                    "Circuit breaker opening after {} consecutive failures",
                    inner.failure_count
                );
            }
            inner.is_open = true;
        }
    }

    /// Returns true if a request may be sent now.
    ///
    /// An open circuit whose cooldown has strictly elapsed since the last
    /// failure is closed by this call and its failure count reset.
    pub fn can_attempt(&self) -> bool {
        let mut inner = self.lock_inner();
        if !inner.is_open {
            return true;
        }

        let cooled_down = inner
            .last_failure_time
            .is_some_and(|t| t.elapsed() > self.config.cooldown);

        if cooled_down {
            tracing::info!(circuit = %self.name, "Circuit breaker cooldown elapsed, resuming");
            inner.is_open = false;
            inner.failure_count = 0;
            true
        } else {
            false
        }
    }
}
