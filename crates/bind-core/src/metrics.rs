//! Per-layer attempt/success/failure counters for the fetch waterfall.
//!
//! Counters only ever grow; they live for the lifetime of the process.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// A transport strategy tried by the fetch waterfall, in attempt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Browser-impersonating client, direct connection.
    Primary,
    /// Browser-impersonating client routed through the configured proxy.
    PrimaryProxy,
    /// Conservative HTTP/1.1 client, direct connection.
    Fallback,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Primary, Layer::PrimaryProxy, Layer::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Primary => "primary",
            Layer::PrimaryProxy => "primary_proxy",
            Layer::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerCounters {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

impl LayerCounters {
    /// Success percentage, or `None` when the layer was never attempted.
    pub fn success_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.successes as f64 / self.attempts as f64 * 100.0)
    }
}

/// Shared, process-local layer metrics. Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct LayerMetrics {
    counters: Arc<Mutex<BTreeMap<Layer, LayerCounters>>>,
}

impl LayerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<Layer, LayerCounters>> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, layer: Layer, success: bool) {
        let mut counters = self.lock();
        let entry = counters.entry(layer).or_default();
        entry.attempts += 1;
        if success {
            entry.successes += 1;
        } else {
            entry.failures += 1;
        }
    }

    pub fn get(&self, layer: Layer) -> LayerCounters {
        self.lock().get(&layer).copied().unwrap_or_default()
    }

    /// One human-readable line per layer that has been attempted at least once.
    pub fn summary_lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|(layer, c)| {
                c.success_rate().map(|rate| {
                    format!(
                        "{layer}: {rate:.1}% success ({}/{})",
                        c.successes, c.attempts
                    )
                })
            })
            .collect()
    }

    /// Logs the per-layer summary.
    pub fn report(&self) {
        for line in self.summary_lines() {
            tracing::info!("{line}");
        }
    }
}
