use std::path::{Path, PathBuf};
use std::time::Duration;

use bind_core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use bind_core::throttle::ThrottleConfig;
use bind_core::testutil::MockTransport;
use bind_core::waterfall::FetchWaterfall;

pub const BASE: &str = "http://books.example";

/// Output directory nested in `root`, so `trackers.json` stays inside `root`.
pub fn output_dir(root: &Path) -> PathBuf {
    let dir = root.join("magnets");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn waterfall(
    primary: &MockTransport,
    fallback: &MockTransport,
    threshold: u32,
) -> FetchWaterfall<MockTransport> {
    let breaker = CircuitBreaker::new(
        "origin",
        CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(300),
        },
    );
    FetchWaterfall::new(primary.clone(), fallback.clone(), breaker)
        .with_throttle(ThrottleConfig::disabled())
}
