pub mod atomic_store;
pub mod circuit_breaker;
pub mod config;
pub mod daemon;
pub mod error;
pub mod harvest;
pub mod identifier;
pub mod ledger;
pub mod link;
pub mod metrics;
pub mod models;
pub mod output;
pub mod testutil;
pub mod throttle;
pub mod trackers;
pub mod traits;
pub mod waterfall;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use config::{ConfigOverrides, HarvestConfig, ensure_output_dir};
pub use daemon::{
    DaemonConfig, HarvestDaemon, HarvestEvent, HarvestReporter, HarvestSummary,
    TracingHarvestReporter,
};
pub use error::AppError;
pub use harvest::HarvestService;
pub use identifier::canonicalize;
pub use ledger::HistoryLedger;
pub use link::{ParsedLink, build_link};
pub use metrics::{Layer, LayerMetrics};
pub use models::{CandidateRecord, FeedEntry, HashField};
pub use output::LinkArchive;
pub use throttle::ThrottleConfig;
pub use trackers::TrackerManager;
pub use traits::{DocumentParser, Fetcher, Transport};
pub use waterfall::FetchWaterfall;
