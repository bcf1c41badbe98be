use bind_core::ledger::HistoryLedger;
use bind_core::link::{ParsedLink, build_link};
use bind_core::output::LinkArchive;
use bind_core::trackers::TrackerManager;

use crate::integration::common::output_dir;

#[test]
fn ledger_survives_restart() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());

    let mut first = HistoryLedger::open(&out);
    first.add("ABC123DEF456789012345678901234567890ABCD");
    first.add("abc123def456789012345678901234567890abcd");
    first.add("c12fe1c06bba254a9dc9f519b335aa7c1367a88a");
    drop(first);

    let second = HistoryLedger::open(&out);
    assert_eq!(second.len(), 2);
    assert!(second.exists("abc123def456789012345678901234567890abcd"));
    assert!(second.exists("C12FE1C06BBA254A9DC9F519B335AA7C1367A88A"));

    let contents = std::fs::read_to_string(second.path()).unwrap();
    assert_eq!(contents.lines().count(), 2);
    assert!(contents.lines().all(|l| l == l.to_lowercase()));
}

#[test]
fn trackers_survive_restart_and_reset() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());

    let manager = TrackerManager::new(&out).unwrap();
    assert_eq!(manager.path(), root.path().join("trackers.json"));
    assert_eq!(manager.get(), TrackerManager::defaults());

    manager
        .set_from_text("udp://a.example:80/announce\n\n  https://b.example/announce  \nftp://nope\nUDP://A.EXAMPLE:80/ANNOUNCE\n")
        .unwrap();

    let reopened = TrackerManager::new(&out).unwrap();
    assert_eq!(
        reopened.get(),
        vec!["udp://a.example:80/announce", "https://b.example/announce"]
    );

    reopened.reset().unwrap();
    assert_eq!(manager.get(), TrackerManager::defaults());
}

#[test]
fn corrupt_tracker_file_falls_back_to_defaults() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());
    let manager = TrackerManager::new(&out).unwrap();

    std::fs::write(manager.path(), "{ not json").unwrap();
    assert_eq!(manager.get(), TrackerManager::defaults());

    manager.save(&["http://c.example/announce"]).unwrap();
    assert_eq!(manager.get(), vec!["http://c.example/announce"]);
}

#[test]
fn archived_links_regenerate_with_current_trackers() {
    let root = tempfile::tempdir().unwrap();
    let out = output_dir(root.path());
    let manager = TrackerManager::new(&out).unwrap();
    let archive = LinkArchive::new(&out);

    let id = "abc123def456789012345678901234567890abcd";
    archive
        .append_today(&build_link(id, "A Book: Part 1", &manager.get()))
        .unwrap();

    manager.save(&["udp://new.example:1337/announce"]).unwrap();

    let stored = archive.recent(10).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].trackers, TrackerManager::defaults());

    let refreshed = stored[0].regenerate(&manager.get());
    let parsed = ParsedLink::parse(&refreshed).unwrap();
    assert_eq!(parsed.identifier, id);
    assert_eq!(parsed.title, "A Book: Part 1");
    assert_eq!(parsed.trackers, vec!["udp://new.example:1337/announce"]);
}
