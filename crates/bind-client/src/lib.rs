pub mod parser;
pub mod transport;

pub use parser::HtmlDocumentParser;
pub use transport::ReqwestTransport;

use bind_core::circuit_breaker::CircuitBreaker;
use bind_core::config::HarvestConfig;
use bind_core::error::AppError;
use bind_core::metrics::LayerMetrics;
use bind_core::waterfall::FetchWaterfall;

/// Builds the production waterfall from a resolved configuration.
///
/// The proxy layer is only present when a proxy is configured.
pub fn build_waterfall(
    config: &HarvestConfig,
    metrics: LayerMetrics,
) -> Result<FetchWaterfall<ReqwestTransport>, AppError> {
    let primary = ReqwestTransport::impersonating(config.request_timeout)?;
    let fallback = ReqwestTransport::conservative(config.request_timeout)?;
    let breaker = CircuitBreaker::new("origin", config.breaker.clone());

    let mut waterfall = FetchWaterfall::new(primary, fallback, breaker)
        .with_throttle(config.throttle.clone())
        .with_metrics(metrics);

    if let Some(proxy) = &config.proxy {
        tracing::info!(proxy = %bind_core::config::redact_proxy(proxy), "Proxy layer enabled");
        waterfall = waterfall.with_proxy(ReqwestTransport::proxied(config.request_timeout, proxy)?);
    }

    Ok(waterfall)
}
