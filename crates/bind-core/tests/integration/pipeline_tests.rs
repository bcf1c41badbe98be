use bind_core::daemon::{DaemonConfig, HarvestDaemon, TracingHarvestReporter};
use bind_core::error::AppError;
use bind_core::harvest::HarvestService;
use bind_core::ledger::HistoryLedger;
use bind_core::metrics::Layer;
use bind_core::output::LinkArchive;
use bind_core::testutil::{MockParser, MockTransport};
use bind_core::trackers::TrackerManager;
use url::Url;

use crate::integration::common::{BASE, output_dir, waterfall};

const HASH: &str = "abc123def456789012345678901234567890abcd";
const CHALLENGE: &str = "<title>Just a moment...</title>";

#[tokio::test]
async fn daemon_pass_through_waterfall() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());

    // Feed: primary is soft-blocked, fallback serves it.
    // Detail: primary serves it directly.
    let primary = MockTransport::with_responses(vec![
        Ok(CHALLENGE.to_string()),
        Ok(format!("Info Hash: {HASH}")),
    ]);
    let fallback = MockTransport::with_responses(vec![Ok("A Book|/a/".to_string())]);
    let wf = waterfall(&primary, &fallback, 3);
    let metrics = wf.metrics().clone();

    let service = HarvestService::new(wf, MockParser, Url::parse(BASE).unwrap());
    let mut daemon = HarvestDaemon::new(
        service,
        HistoryLedger::open(&out),
        TrackerManager::new(&out).unwrap(),
        LinkArchive::new(&out),
        DaemonConfig::default(),
    )
    .with_metrics(metrics.clone());

    let summary = daemon.run_once(&TracingHarvestReporter).await;
    assert_eq!(summary.emitted, 1);
    assert_eq!(
        primary.calls(),
        vec![format!("{BASE}/rss"), format!("{BASE}/a/")]
    );
    assert_eq!(metrics.get(Layer::Primary).attempts, 2);
    assert_eq!(metrics.get(Layer::Primary).failures, 1);
    assert_eq!(metrics.get(Layer::Fallback).successes, 1);

    let links = LinkArchive::new(&out).recent(5).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].identifier, HASH);
    assert_eq!(links[0].title, "A Book");
}

#[tokio::test]
async fn open_breaker_short_circuits_remaining_details() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());
    let down = || Err(AppError::NetworkError("connection refused".into()));

    let primary = MockTransport::with_responses(vec![
        Ok("One|/1/\nTwo|/2/\nThree|/3/".to_string()),
        down(),
    ]);
    let fallback = MockTransport::with_responses(vec![down()]);
    let wf = waterfall(&primary, &fallback, 1);
    let breaker = wf.circuit_breaker().clone();

    let service = HarvestService::new(wf, MockParser, Url::parse(BASE).unwrap());
    let mut daemon = HarvestDaemon::new(
        service,
        HistoryLedger::open(&out),
        TrackerManager::new(&out).unwrap(),
        LinkArchive::new(&out),
        DaemonConfig::default(),
    );

    let summary = daemon.run_once(&TracingHarvestReporter).await;
    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.missing_identifier, 3);
    assert_eq!(summary.emitted, 0);
    assert!(breaker.is_open());
    // Only the first detail page reached the network.
    assert_eq!(primary.call_count(), 2);
    assert_eq!(fallback.call_count(), 1);
    assert!(daemon.ledger().is_empty());
}
