use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::harvest::HarvestService;
use crate::ledger::HistoryLedger;
use crate::link::build_link;
use crate::metrics::LayerMetrics;
use crate::output::LinkArchive;
use crate::trackers::TrackerManager;
use crate::traits::{DocumentParser, Fetcher};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Time between the end of one harvest and the start of the next.
    pub interval: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl DaemonConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Counts for a single harvest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub candidates: usize,
    pub emitted: usize,
    pub duplicates: usize,
    pub missing_identifier: usize,
    pub failed_writes: usize,
}

/// Events emitted by the daemon for monitoring/logging.
#[derive(Debug, Clone)]
pub enum HarvestEvent<'a> {
    Started {
        interval: Duration,
        output_dir: &'a Path,
    },
    JobStarted,
    CandidatesFound {
        count: usize,
    },
    Processing {
        title: &'a str,
    },
    Duplicate {
        title: &'a str,
        identifier: &'a str,
    },
    IdentifierMissing {
        title: &'a str,
    },
    LinkEmitted {
        title: &'a str,
        identifier: &'a str,
        path: &'a Path,
    },
    EmitFailed {
        title: &'a str,
        error: &'a str,
    },
    JobCompleted {
        summary: &'a HarvestSummary,
    },
    ShuttingDown,
    Stopped,
}

/// Trait for receiving daemon events (decoupled logging).
pub trait HarvestReporter: Send + Sync {
    fn report(&self, event: HarvestEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHarvestReporter;

impl HarvestReporter for TracingHarvestReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        match event {
            HarvestEvent::Started {
                interval,
                output_dir,
            } => {
                tracing::info!(
                    interval_mins = interval.as_secs() / 60,
                    output_dir = %output_dir.display(),
                    "Daemon started"
                );
            }
            HarvestEvent::JobStarted => {
                tracing::info!("Checking for new uploads");
            }
            HarvestEvent::CandidatesFound { count } => {
                tracing::info!(%count, "Found recent uploads");
            }
            HarvestEvent::Processing { title } => {
                tracing::info!(%title, "Processing");
            }
            HarvestEvent::Duplicate { title, identifier } => {
                tracing::debug!(%title, %identifier, "Already harvested");
            }
            HarvestEvent::IdentifierMissing { title } => {
                tracing::warn!(%title, "Failed to extract hash");
            }
            HarvestEvent::LinkEmitted {
                title,
                identifier,
                path,
            } => {
                tracing::info!(%title, %identifier, path = %path.display(), "Saved magnet link");
            }
            HarvestEvent::EmitFailed { title, error } => {
                tracing::error!(%title, %error, "Failed to save magnet link");
            }
            HarvestEvent::JobCompleted { summary } => {
                tracing::info!(
                    candidates = summary.candidates,
                    emitted = summary.emitted,
                    duplicates = summary.duplicates,
                    missing = summary.missing_identifier,
                    failed_writes = summary.failed_writes,
                    "Harvest completed"
                );
            }
            HarvestEvent::ShuttingDown => {
                tracing::info!("Daemon shutting down");
            }
            HarvestEvent::Stopped => {
                tracing::info!("Daemon stopped");
            }
        }
    }
}

/// Periodic harvester: feed, then detail pages, then dedup, then emitted links.
pub struct HarvestDaemon<F, P>
where
    F: Fetcher,
    P: DocumentParser,
{
    service: HarvestService<F, P>,
    ledger: HistoryLedger,
    trackers: TrackerManager,
    archive: LinkArchive,
    metrics: Option<LayerMetrics>,
    config: DaemonConfig,
}

impl<F, P> HarvestDaemon<F, P>
where
    F: Fetcher,
    P: DocumentParser,
{
    pub fn new(
        service: HarvestService<F, P>,
        ledger: HistoryLedger,
        trackers: TrackerManager,
        archive: LinkArchive,
        config: DaemonConfig,
    ) -> Self {
        Self {
            service,
            ledger,
            trackers,
            archive,
            metrics: None,
            config,
        }
    }

    /// Layer metrics to summarize after every pass.
    pub fn with_metrics(mut self, metrics: LayerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn archive(&self) -> &LinkArchive {
        &self.archive
    }

    /// Run the harvest loop until cancellation.
    ///
    /// The first pass starts immediately. Cancellation is only observed
    /// between passes, so a pass in progress always completes.
    pub async fn run<R: HarvestReporter>(&mut self, cancel_token: CancellationToken, reporter: &R) {
        reporter.report(HarvestEvent::Started {
            interval: self.config.interval,
            output_dir: self.archive.dir(),
        });

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            self.run_once(reporter).await;

            tokio::select! {
                () = tokio::time::sleep(self.config.interval) => {}
                () = cancel_token.cancelled() => break,
            }
        }

        reporter.report(HarvestEvent::ShuttingDown);
        reporter.report(HarvestEvent::Stopped);
    }

    /// One full harvest pass.
    pub async fn run_once<R: HarvestReporter>(&mut self, reporter: &R) -> HarvestSummary {
        reporter.report(HarvestEvent::JobStarted);

        let candidates = self.service.get_recent_candidates().await;
        let mut summary = HarvestSummary {
            candidates: candidates.len(),
            ..Default::default()
        };
        reporter.report(HarvestEvent::CandidatesFound {
            count: candidates.len(),
        });

        for candidate in &candidates {
            let title = candidate.title.as_str();
            reporter.report(HarvestEvent::Processing { title });

            let Some(identifier) = self
                .service
                .extract_identifier(candidate.detail_link.as_str())
                .await
            else {
                summary.missing_identifier += 1;
                reporter.report(HarvestEvent::IdentifierMissing { title });
                continue;
            };

            if self.ledger.exists(&identifier) {
                summary.duplicates += 1;
                reporter.report(HarvestEvent::Duplicate {
                    title,
                    identifier: &identifier,
                });
                continue;
            }

            let link = build_link(&identifier, title, &self.trackers.get());

            // Recorded only once the link is on disk, so a failed write is
            // retried on the next pass.
            match self.archive.append_today(&link) {
                Ok(path) => {
                    self.ledger.add(&identifier);
                    summary.emitted += 1;
                    reporter.report(HarvestEvent::LinkEmitted {
                        title,
                        identifier: &identifier,
                        path: &path,
                    });
                }
                Err(e) => {
                    summary.failed_writes += 1;
                    let error = e.to_string();
                    reporter.report(HarvestEvent::EmitFailed {
                        title,
                        error: &error,
                    });
                }
            }
        }

        reporter.report(HarvestEvent::JobCompleted { summary: &summary });
        if let Some(metrics) = &self.metrics {
            metrics.report();
        }

        summary
    }
}
