//! Multi-layer fetch with circuit-breaker gating.
//!
//! A fetch call tries the transport layers in order and returns the first
//! usable body:
//!
//! 1. [`Layer::Primary`]: browser-impersonating client, direct.
//! 2. [`Layer::PrimaryProxy`]: the same client through the proxy, if one is configured.
//! 3. [`Layer::Fallback`]: conservative client, direct.
//!
//! Each layer is tried at most once per call. A success-status page carrying
//! an anti-bot challenge is a soft block and counts as a failed layer. When
//! every layer fails, the circuit breaker records a single failure for the
//! whole call.

use crate::circuit_breaker::CircuitBreaker;
use crate::error::AppError;
use crate::metrics::{Layer, LayerMetrics};
use crate::throttle::ThrottleConfig;
use crate::traits::{Fetcher, Transport};

/// Substrings that identify an anti-automation challenge page.
pub const SOFT_BLOCK_MARKERS: [&str; 2] = ["Just a moment...", "Attention Required"];

/// Outcome of a single layer attempt, independent of the transport library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerOutcome {
    Success(String),
    TransportFailure(String),
    SoftBlock,
}

impl LayerOutcome {
    pub fn classify(result: Result<String, AppError>) -> Self {
        match result {
            Ok(body) if is_soft_block(&body) => LayerOutcome::SoftBlock,
            Ok(body) => LayerOutcome::Success(body),
            Err(e) => LayerOutcome::TransportFailure(e.to_string()),
        }
    }
}

pub fn is_soft_block(body: &str) -> bool {
    SOFT_BLOCK_MARKERS.iter().any(|marker| body.contains(marker))
}

#[derive(Clone)]
pub struct FetchWaterfall<T> {
    primary: T,
    proxied: Option<T>,
    fallback: T,
    circuit_breaker: CircuitBreaker,
    metrics: LayerMetrics,
    throttle: ThrottleConfig,
}

impl<T: Transport> FetchWaterfall<T> {
    pub fn new(primary: T, fallback: T, circuit_breaker: CircuitBreaker) -> Self {
        Self {
            primary,
            proxied: None,
            fallback,
            circuit_breaker,
            metrics: LayerMetrics::new(),
            throttle: ThrottleConfig::default(),
        }
    }

    /// Enable the proxy layer.
    pub fn with_proxy(mut self, proxied: T) -> Self {
        self.proxied = Some(proxied);
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_metrics(mut self, metrics: LayerMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn metrics(&self) -> &LayerMetrics {
        &self.metrics
    }

    fn layers(&self) -> impl Iterator<Item = (Layer, &T)> {
        [
            Some((Layer::Primary, &self.primary)),
            self.proxied.as_ref().map(|t| (Layer::PrimaryProxy, t)),
            Some((Layer::Fallback, &self.fallback)),
        ]
        .into_iter()
        .flatten()
    }

    async fn attempt(&self, layer: Layer, transport: &T, url: &str) -> Option<String> {
        match LayerOutcome::classify(transport.get(url).await) {
            LayerOutcome::Success(body) => {
                self.metrics.record(layer, true);
                self.circuit_breaker.record_success();
                if layer == Layer::Primary {
                    tracing::debug!(%url, %layer, bytes = body.len(), "Fetched");
                } else {
                    tracing::info!(%url, %layer, bytes = body.len(), "Fetched");
                }
                Some(body)
            }
            LayerOutcome::SoftBlock => {
                self.metrics.record(layer, false);
                tracing::warn!(%url, %layer, "Challenge page detected");
                None
            }
            LayerOutcome::TransportFailure(error) => {
                self.metrics.record(layer, false);
                tracing::warn!(%url, %layer, %error, "Layer failed");
                None
            }
        }
    }
}

impl<T: Transport> Fetcher for FetchWaterfall<T> {
    async fn fetch(&self, url: &str) -> Option<String> {
        if !self.circuit_breaker.can_attempt() {
            let retry_in_secs = self
                .circuit_breaker
                .time_until_retry()
                .map(|d| d.as_secs())
                .unwrap_or_default();
            tracing::error!(
                %url,
                circuit = %self.circuit_breaker.name(),
                retry_in_secs,
                "Circuit breaker open, skipping request"
            );
            return None;
        }

        self.throttle.pause().await;

        for (layer, transport) in self.layers() {
            if let Some(body) = self.attempt(layer, transport, url).await {
                return Some(body);
            }
        }

        tracing::error!(%url, "All layers failed");
        self.circuit_breaker.record_failure();
        None
    }
}
