use bind_client::HtmlDocumentParser;
use bind_core::daemon::{DaemonConfig, HarvestDaemon, TracingHarvestReporter};
use bind_core::ledger::HistoryLedger;
use bind_core::output::LinkArchive;
use bind_core::trackers::TrackerManager;
use bind_core::harvest::HarvestService;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::{
    HASH_BASE32, HASH_BASE32_HEX, HASH_HEX, config, detail_page, feed, output_dir, service,
    waterfall,
};

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn recent_candidates_and_identifiers_from_site() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let absolute = format!("{}/audio-books/emma/", server.uri());
    mount_page(
        &server,
        "/rss",
        feed(&[("Dune", "/audio-books/dune/"), ("Emma", &absolute)]),
    )
    .await;
    mount_page(&server, "/audio-books/dune/", detail_page(HASH_BASE32)).await;

    let svc = service(&config(&server.uri(), dir.path(), None));

    let candidates = svc.get_recent_candidates().await;
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].title, "Dune");
    assert_eq!(
        candidates[0].detail_link.as_str(),
        format!("{}/audio-books/dune/", server.uri())
    );
    assert_eq!(candidates[1].detail_link.as_str(), absolute);

    assert_eq!(
        svc.extract_identifier("/audio-books/dune/").await.as_deref(),
        Some(HASH_BASE32_HEX)
    );
    // Detail page is a 404, every layer fails.
    assert_eq!(svc.extract_identifier("/audio-books/emma/").await, None);
}

#[tokio::test]
async fn search_reads_post_titles() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("s", "dune messiah"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="post"><div class="postTitle"><h2>
               <a href="/audio-books/dune-messiah/">Dune Messiah</a></h2></div></div>"#,
        ))
        .mount(&server)
        .await;

    let svc = service(&config(&server.uri(), dir.path(), None));
    let results = svc.search("dune messiah").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Dune Messiah");
    assert!(results[0].detail_link.path().ends_with("/audio-books/dune-messiah/"));
}

#[tokio::test]
async fn daemon_pass_writes_links_and_history() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let out = output_dir(root.path());
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/rss",
        feed(&[
            ("The Hobbit", "/audio-books/hobbit/"),
            ("Dune & Sons", "/audio-books/dune/"),
            ("Broken", "/audio-books/broken/"),
        ]),
    )
    .await;
    mount_page(&server, "/audio-books/hobbit/", detail_page(&HASH_HEX.to_uppercase())).await;
    mount_page(&server, "/audio-books/dune/", detail_page(HASH_BASE32)).await;
    mount_page(
        &server,
        "/audio-books/broken/",
        "<html><body><p>No table</p></body></html>".to_string(),
    )
    .await;

    let config = config(&server.uri(), &out, None);
    let (waterfall, metrics) = waterfall(&config);
    let service = HarvestService::new(waterfall, HtmlDocumentParser::new(), config.base_url.clone());
    let trackers = TrackerManager::new(&out)?;
    assert_eq!(trackers.path(), root.path().join("trackers.json"));

    let mut daemon = HarvestDaemon::new(
        service,
        HistoryLedger::open(&out),
        trackers,
        LinkArchive::new(&out),
        DaemonConfig::default(),
    )
    .with_metrics(metrics.clone());

    let summary = daemon.run_once(&TracingHarvestReporter).await;
    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.missing_identifier, 1);

    let history = std::fs::read_to_string(out.join("history.log"))?;
    let lines: Vec<&str> = history.lines().collect();
    assert_eq!(lines, vec![HASH_HEX, HASH_BASE32_HEX]);

    let links = LinkArchive::new(&out).recent(10)?;
    assert_eq!(links.len(), 2);
    let dune = links
        .iter()
        .find(|l| l.identifier == HASH_BASE32_HEX)
        .expect("dune link");
    assert_eq!(dune.title, "Dune & Sons");
    assert_eq!(dune.trackers, TrackerManager::defaults());

    // A restarted daemon sees the same history and emits nothing new.
    let ledger = HistoryLedger::open(&out);
    assert!(ledger.exists(&HASH_HEX.to_uppercase()));
    let second = daemon.run_once(&TracingHarvestReporter).await;
    assert_eq!(second.emitted, 0);
    assert_eq!(second.duplicates, 2);

    assert_eq!(metrics.get(bind_core::metrics::Layer::Primary).attempts, 8);
    Ok(())
}
