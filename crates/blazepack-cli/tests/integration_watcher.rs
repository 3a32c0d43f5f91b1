//! Integration tests for the snapshot reader and the change watcher against
//! a real filesystem.

use blazepack_cli::dev::{read_snapshot, ChangeWatcher};
use blazepack_cli::IgnoreRules;
use blazepack_protocol::ChangeEvent;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration, Instant};

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src/components")).unwrap();
    fs::create_dir_all(root.join("node_modules/react")).unwrap();
    fs::write(root.join("package.json"), "{}").unwrap();
    fs::write(root.join("src/index.js"), "import './App';").unwrap();
    fs::write(root.join("src/components/Button.js"), "export {}").unwrap();
    fs::write(root.join("node_modules/react/index.js"), "module.exports = {}").unwrap();
    fs::write(root.join("yarn.lock"), "").unwrap();
    fs::write(root.join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    temp
}

/// Wait for an event matching `predicate`, skipping others.
async fn expect_event<F>(events: &mut mpsc::Receiver<ChangeEvent>, predicate: F) -> ChangeEvent
where
    F: Fn(&ChangeEvent) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, events.recv()).await {
            Ok(Some(event)) if predicate(&event) => return event,
            Ok(Some(_)) => continue,
            Ok(None) => panic!("watcher stopped"),
            Err(_) => panic!("timed out waiting for change event"),
        }
    }
}

#[test]
fn test_snapshot_of_project() {
    let temp = project();
    let snapshot = read_snapshot(temp.path(), &IgnoreRules::default()).unwrap();

    let paths: Vec<&str> = snapshot.paths().collect();
    assert_eq!(
        paths,
        vec![
            "/logo.png",
            "/package.json",
            "/src/components/Button.js",
            "/src/index.js"
        ]
    );
    assert!(snapshot.get("/logo.png").unwrap().is_binary());
}

#[tokio::test]
async fn test_watcher_reports_new_and_changed_files() {
    let temp = project();
    let root = temp.path().canonicalize().unwrap();
    let (watcher, mut events) =
        ChangeWatcher::start(root.clone(), Arc::new(IgnoreRules::default()))
            .await
            .unwrap();

    assert_eq!(watcher.summary().files, 4);

    fs::write(root.join("src/new.js"), "x").unwrap();
    let event = expect_event(&mut events, |e| {
        matches!(e, ChangeEvent::Add { path, content } | ChangeEvent::Change { path, content }
            if path == "/src/new.js" && content == "x")
    })
    .await;
    assert_eq!(event.path(), "/src/new.js");

    fs::write(root.join("src/index.js"), "import './Other';").unwrap();
    expect_event(&mut events, |e| {
        matches!(e, ChangeEvent::Change { path, content }
            if path == "/src/index.js" && content == "import './Other';")
    })
    .await;

    fs::remove_file(root.join("src/components/Button.js")).unwrap();
    expect_event(&mut events, |e| {
        matches!(e, ChangeEvent::Unlink { path } if path == "/src/components/Button.js")
    })
    .await;
}

#[tokio::test]
async fn test_watcher_ignores_dependencies() {
    let temp = project();
    let root = temp.path().canonicalize().unwrap();
    let (_watcher, mut events) =
        ChangeWatcher::start(root.clone(), Arc::new(IgnoreRules::default()))
            .await
            .unwrap();

    fs::write(root.join("node_modules/react/index.js"), "changed").unwrap();
    fs::write(root.join("marker.js"), "m").unwrap();

    let event = expect_event(&mut events, |e| !e.path().starts_with("/node_modules")).await;
    assert_eq!(event.path(), "/marker.js");
}
