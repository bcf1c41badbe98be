//! Startup configuration.
//!
//! Everything is resolved once, before any component is built, and each
//! component receives only its own section. Explicit overrides (CLI flags)
//! win over environment variables, which win over defaults.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::daemon::DaemonConfig;
use crate::error::AppError;
use crate::throttle::ThrottleConfig;

pub const BASE_URL_ENV: &str = "BIND_URL";
pub const PROXY_ENV: &str = "BIND_PROXY";
pub const OUTPUT_DIR_ENV: &str = "BIND_OUTPUT_DIR";
pub const REQUEST_TIMEOUT_ENV: &str = "BIND_REQUEST_TIMEOUT";

pub const DEFAULT_BASE_URL: &str = "http://audiobookbay.lu";
pub const DEFAULT_OUTPUT_DIR: &str = "magnets";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub proxy: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub interval: Option<Duration>,
    pub breaker_threshold: Option<u32>,
    pub breaker_cooldown: Option<Duration>,
}

#[derive(Clone)]
pub struct HarvestConfig {
    pub base_url: Url,
    /// Proxy URL for the second waterfall layer. May carry credentials.
    pub proxy: Option<String>,
    pub output_dir: PathBuf,
    pub request_timeout: Duration,
    pub throttle: ThrottleConfig,
    pub breaker: CircuitBreakerConfig,
    pub daemon: DaemonConfig,
}

impl HarvestConfig {
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, AppError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        // Blank variables count as unset.
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_base = overrides
            .base_url
            .or_else(|| lookup(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(raw_base.trim())
            .map_err(|e| AppError::ConfigError(format!("Invalid base URL '{raw_base}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "Base URL '{raw_base}' must use http or https"
            )));
        }

        let proxy = overrides
            .proxy
            .or_else(|| lookup(PROXY_ENV))
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(proxy) = &proxy {
            Url::parse(proxy).map_err(|e| {
                AppError::ConfigError(format!("Invalid proxy URL '{}': {e}", redact_proxy(proxy)))
            })?;
        }

        let output_dir = overrides
            .output_dir
            .or_else(|| lookup(OUTPUT_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let request_timeout = match lookup(REQUEST_TIMEOUT_ENV) {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(AppError::ConfigError(format!(
                        "Invalid {REQUEST_TIMEOUT_ENV} '{raw}': must be a positive number of seconds"
                    )));
                }
            },
        };

        let breaker = CircuitBreakerConfig::resolve_with(
            overrides.breaker_threshold,
            overrides.breaker_cooldown,
            &lookup,
        )?;

        let mut daemon = DaemonConfig::default();
        if let Some(interval) = overrides.interval {
            if interval.is_zero() {
                return Err(AppError::ConfigError(
                    "Daemon interval must be greater than zero".into(),
                ));
            }
            daemon = daemon.with_interval(interval);
        }

        Ok(Self {
            base_url,
            proxy,
            output_dir,
            request_timeout,
            throttle: ThrottleConfig::default(),
            breaker,
            daemon,
        })
    }

    pub fn redacted_proxy(&self) -> Option<String> {
        self.proxy.as_deref().map(redact_proxy)
    }
}

impl fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("base_url", &self.base_url.as_str())
            .field("proxy", &self.redacted_proxy())
            .field("output_dir", &self.output_dir)
            .field("request_timeout", &self.request_timeout)
            .field("throttle", &self.throttle)
            .field("breaker", &self.breaker)
            .field("daemon", &self.daemon)
            .finish()
    }
}

/// Proxy URL with any user name and password masked, for logging.
pub fn redact_proxy(proxy: &str) -> String {
    match Url::parse(proxy) {
        Ok(mut url) => {
            if !url.username().is_empty() {
                let _ = url.set_username("***");
            }
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparsable proxy>".to_string(),
    }
}

/// Creates the output directory if needed and checks that it is writable.
pub fn ensure_output_dir(path: &Path) -> Result<(), AppError> {
    fs::create_dir_all(path).map_err(|e| {
        AppError::ConfigError(format!(
            "Cannot create output directory {}: {e}",
            path.display()
        ))
    })?;

    let probe = path.join(".bind-write-probe");
    fs::write(&probe, b"").map_err(|e| {
        AppError::ConfigError(format!(
            "Output directory {} is not writable: {e}",
            path.display()
        ))
    })?;
    if let Err(e) = fs::remove_file(&probe) {
        tracing::warn!(path = %probe.display(), error = %e, "Failed to remove write probe");
    }

    Ok(())
}
