//! Recursive file system watcher producing [`ChangeEvent`]s.
//!
//! The watcher scans the project to learn which paths are files and which
//! are directories. Raw notify events are then classified against that
//! index into add / change / unlink / addDir / unlinkDir. For add and change
//! events the file is read immediately, so each event carries the content
//! present at the time it was observed.

use super::ignore::IgnoreRules;
use super::snapshot::{read_record, virtual_path};
use crate::error::{CliError, Result};
use blazepack_protocol::ChangeEvent;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use walkdir::WalkDir;

/// Pending events buffered between the notify thread and the session.
const EVENT_BUFFER: usize = 1024;

/// Result of the initial scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files known to the watcher
    pub files: usize,
    /// Directories known to the watcher, root excluded
    pub directories: usize,
}

/// Known paths under the root, used to tell files from directories once a
/// path has disappeared.
#[derive(Debug, Default)]
struct WatchIndex {
    files: HashSet<PathBuf>,
    directories: HashSet<PathBuf>,
}

impl WatchIndex {
    fn scan(root: &Path, rules: &IgnoreRules) -> Self {
        let mut index = Self::default();
        index.scan_into(root, root, rules);
        index
    }

    /// Record everything under `dir`. Unreadable entries are skipped; they
    /// will be picked up by later events if they become readable.
    fn scan_into(&mut self, root: &Path, dir: &Path, rules: &IgnoreRules) -> Vec<PathBuf> {
        let mut discovered = Vec::new();
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .map(|rel| !rules.is_ignored(rel))
                    .unwrap_or(false)
            });

        for entry in walker.flatten() {
            let path = entry.path();
            if path == root {
                continue;
            }
            if entry.file_type().is_dir() {
                if self.directories.insert(path.to_path_buf()) {
                    discovered.push(path.to_path_buf());
                }
            } else if path.is_file() && self.files.insert(path.to_path_buf()) {
                discovered.push(path.to_path_buf());
            }
        }
        discovered
    }

    fn forget_below(&mut self, dir: &Path) {
        self.files.retain(|p| !p.starts_with(dir));
        self.directories.retain(|p| !p.starts_with(dir));
    }

    fn summary(&self) -> ScanSummary {
        ScanSummary {
            files: self.files.len(),
            directories: self.directories.len(),
        }
    }
}

/// Turns raw notify events into [`ChangeEvent`]s.
///
/// Holds the watch index. Public so the classification rules can be driven
/// without real file system notifications.
#[derive(Debug)]
pub struct EventClassifier {
    root: PathBuf,
    rules: Arc<IgnoreRules>,
    index: WatchIndex,
}

impl EventClassifier {
    /// Scan `root` and build a classifier.
    pub fn new(root: PathBuf, rules: Arc<IgnoreRules>) -> Self {
        let index = WatchIndex::scan(&root, &rules);
        Self { root, rules, index }
    }

    /// Counts from the scan plus everything learned since.
    pub fn summary(&self) -> ScanSummary {
        self.index.summary()
    }

    /// Classify one notify event. Produces zero or more change events in the
    /// order they should be delivered.
    pub fn classify(&mut self, event: &Event) -> Vec<ChangeEvent> {
        let mut out = Vec::new();

        match event.kind {
            EventKind::Create(kind) => {
                for path in &event.paths {
                    self.created(path, kind == CreateKind::Folder, &mut out);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                self.removed(&event.paths[0], &mut out);
                self.created(&event.paths[1], false, &mut out);
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                for path in &event.paths {
                    self.removed(path, &mut out);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for path in &event.paths {
                    self.created(path, false, &mut out);
                }
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                // Backends that cannot pair renames: decide by existence
                for path in &event.paths {
                    if path.exists() {
                        self.created(path, false, &mut out);
                    } else {
                        self.removed(path, &mut out);
                    }
                }
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.modified(path, &mut out);
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.removed(path, &mut out);
                }
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }

        out
    }

    fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if relative.as_os_str().is_empty() || self.rules.is_ignored(relative) {
            return None;
        }
        Some(relative)
    }

    fn created(&mut self, path: &Path, folder_hint: bool, out: &mut Vec<ChangeEvent>) {
        if self.relative(path).is_none() {
            return;
        }

        let is_dir = folder_hint || path.is_dir();
        if is_dir {
            if !path.is_dir() {
                tracing::debug!(path = %path.display(), "Directory vanished before it was indexed");
                return;
            }
            if self.index.directories.insert(path.to_path_buf()) {
                if let Some(vpath) = virtual_path(&self.root, path) {
                    out.push(ChangeEvent::AddDir { path: vpath });
                }
            }
            // A directory moved in arrives as a single event; report its contents
            let rules = Arc::clone(&self.rules);
            for child in self.index.scan_into(&self.root, path, &rules) {
                if child.is_dir() {
                    if let Some(vpath) = virtual_path(&self.root, &child) {
                        out.push(ChangeEvent::AddDir { path: vpath });
                    }
                } else if let Some(event) = self.read_event(&child, true) {
                    out.push(event);
                }
            }
            return;
        }

        let is_new = !self.index.files.contains(path);
        if let Some(event) = self.read_event(path, is_new) {
            self.index.files.insert(path.to_path_buf());
            out.push(event);
        }
    }

    fn modified(&mut self, path: &Path, out: &mut Vec<ChangeEvent>) {
        if self.relative(path).is_none() || self.index.directories.contains(path) {
            return;
        }
        if path.is_dir() {
            return;
        }

        let is_new = !self.index.files.contains(path);
        if let Some(event) = self.read_event(path, is_new) {
            self.index.files.insert(path.to_path_buf());
            out.push(event);
        }
    }

    fn removed(&mut self, path: &Path, out: &mut Vec<ChangeEvent>) {
        if self.relative(path).is_none() {
            return;
        }
        let Some(vpath) = virtual_path(&self.root, path) else {
            return;
        };

        if self.index.directories.remove(path) {
            self.index.forget_below(path);
            out.push(ChangeEvent::UnlinkDir { path: vpath });
        } else if self.index.files.remove(path) {
            out.push(ChangeEvent::Unlink { path: vpath });
        }
    }

    /// Read a file for an add/change event.
    ///
    /// A file deleted between the notification and the read yields nothing;
    /// the following remove notification reports it.
    fn read_event(&self, path: &Path, is_new: bool) -> Option<ChangeEvent> {
        match read_record(&self.root, path) {
            Ok(Some(record)) => Some(if is_new {
                ChangeEvent::Add {
                    path: record.path,
                    content: record.code,
                }
            } else {
                ChangeEvent::Change {
                    path: record.path,
                    content: record.code,
                }
            }),
            Ok(None) => None,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "File disappeared before it could be read");
                None
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read changed file");
                None
            }
        }
    }
}

/// Recursive watcher over the project directory.
///
/// Dropping it stops the underlying OS watch and closes the event channel.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    summary: ScanSummary,
}

impl ChangeWatcher {
    /// Start watching `root` and scan it.
    ///
    /// The OS watch is installed before the scan. Events raised while the
    /// scan runs are queued and replayed against the finished index, so
    /// changes made in that window are not lost. Resolves once the scan is
    /// complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or the OS watch
    /// cannot be installed.
    pub async fn start(
        root: PathBuf,
        rules: Arc<IgnoreRules>,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.send(res);
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();
        let scan_root = root.clone();
        std::thread::Builder::new()
            .name("blazepack-watcher".to_string())
            .spawn(move || run_classifier(scan_root, rules, raw_rx, tx, ready_tx))?;

        let summary = ready_rx
            .await
            .map_err(|_| CliError::Custom("Initial scan failed".to_string()))?;

        tracing::info!(
            root = %root.display(),
            files = summary.files,
            directories = summary.directories,
            "Watching project"
        );

        Ok((
            Self {
                _watcher: watcher,
                root,
                summary,
            },
            rx,
        ))
    }

    /// Root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Counts from the initial scan.
    pub fn summary(&self) -> ScanSummary {
        self.summary
    }
}

/// Scan, report readiness, then classify raw events until the watcher is
/// dropped or the receiving side goes away.
fn run_classifier(
    root: PathBuf,
    rules: Arc<IgnoreRules>,
    mut raw: mpsc::UnboundedReceiver<notify::Result<Event>>,
    tx: mpsc::Sender<ChangeEvent>,
    ready: oneshot::Sender<ScanSummary>,
) {
    let mut classifier = EventClassifier::new(root, rules);
    if ready.send(classifier.summary()).is_err() {
        return;
    }

    while let Some(res) = raw.blocking_recv() {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "File watcher error");
                continue;
            }
        };

        for change in classifier.classify(&event) {
            tracing::debug!(event = %change.kind(), path = change.path(), "File changed");
            if tx.blocking_send(change).is_err() {
                // Session has shut down
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        classifier: EventClassifier,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().canonicalize().unwrap();
            fs::create_dir_all(root.join("src")).unwrap();
            fs::write(root.join("src/App.js"), "v1").unwrap();
            fs::create_dir_all(root.join("node_modules/x")).unwrap();
            let classifier = EventClassifier::new(root, Arc::new(IgnoreRules::default()));
            Self { dir, classifier }
        }

        fn root(&self) -> PathBuf {
            self.dir.path().canonicalize().unwrap()
        }

        fn event(&mut self, kind: EventKind, paths: &[PathBuf]) -> Vec<ChangeEvent> {
            let event = paths
                .iter()
                .fold(Event::new(kind), |event, path| event.add_path(path.clone()));
            self.classifier.classify(&event)
        }
    }

    fn modify() -> EventKind {
        EventKind::Modify(ModifyKind::Data(DataChange::Content))
    }

    #[test]
    fn test_initial_scan_summary() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture.classifier.summary(),
            ScanSummary {
                files: 1,
                directories: 1
            }
        );
    }

    #[test]
    fn test_modify_known_file_is_change() {
        let mut fixture = Fixture::new();
        let app = fixture.root().join("src/App.js");
        fs::write(&app, "v2").unwrap();

        let events = fixture.event(modify(), &[app]);
        assert_eq!(
            events,
            vec![ChangeEvent::Change {
                path: "/src/App.js".into(),
                content: "v2".into()
            }]
        );
    }

    #[test]
    fn test_create_file_is_add() {
        let mut fixture = Fixture::new();
        let new_file = fixture.root().join("src/New.js");
        fs::write(&new_file, "new").unwrap();

        let events = fixture.event(EventKind::Create(CreateKind::File), &[new_file.clone()]);
        assert_eq!(
            events,
            vec![ChangeEvent::Add {
                path: "/src/New.js".into(),
                content: "new".into()
            }]
        );

        // A later write is a change, not a second add
        fs::write(&new_file, "newer").unwrap();
        let events = fixture.event(modify(), &[new_file]);
        assert!(matches!(events[0], ChangeEvent::Change { .. }));
    }

    #[test]
    fn test_modify_unknown_file_is_add() {
        let mut fixture = Fixture::new();
        let file = fixture.root().join("late.js");
        fs::write(&file, "x").unwrap();

        let events = fixture.event(modify(), &[file]);
        assert!(matches!(events[0], ChangeEvent::Add { .. }));
    }

    #[test]
    fn test_remove_file_is_unlink() {
        let mut fixture = Fixture::new();
        let app = fixture.root().join("src/App.js");
        fs::remove_file(&app).unwrap();

        let events = fixture.event(EventKind::Remove(RemoveKind::Any), &[app]);
        assert_eq!(
            events,
            vec![ChangeEvent::Unlink {
                path: "/src/App.js".into()
            }]
        );
    }

    #[test]
    fn test_remove_directory_is_unlink_dir() {
        let mut fixture = Fixture::new();
        let src = fixture.root().join("src");
        fs::remove_dir_all(&src).unwrap();

        let events = fixture.event(EventKind::Remove(RemoveKind::Any), &[src]);
        assert_eq!(
            events,
            vec![ChangeEvent::UnlinkDir {
                path: "/src".into()
            }]
        );
        assert_eq!(fixture.classifier.summary(), ScanSummary::default());
    }

    #[test]
    fn test_create_directory_reports_contents() {
        let mut fixture = Fixture::new();
        let lib = fixture.root().join("lib");
        fs::create_dir_all(lib.join("util")).unwrap();
        fs::write(lib.join("util/math.js"), "add").unwrap();

        let events = fixture.event(EventKind::Create(CreateKind::Folder), &[lib]);
        assert_eq!(
            events,
            vec![
                ChangeEvent::AddDir { path: "/lib".into() },
                ChangeEvent::AddDir {
                    path: "/lib/util".into()
                },
                ChangeEvent::Add {
                    path: "/lib/util/math.js".into(),
                    content: "add".into()
                },
            ]
        );
    }

    #[test]
    fn test_rename_both_is_unlink_then_add() {
        let mut fixture = Fixture::new();
        let from = fixture.root().join("src/App.js");
        let to = fixture.root().join("src/Main.js");
        fs::rename(&from, &to).unwrap();

        let events = fixture.event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &[from, to],
        );
        assert_eq!(
            events,
            vec![
                ChangeEvent::Unlink {
                    path: "/src/App.js".into()
                },
                ChangeEvent::Add {
                    path: "/src/Main.js".into(),
                    content: "v1".into()
                },
            ]
        );
    }

    #[test]
    fn test_ignored_paths_produce_nothing() {
        let mut fixture = Fixture::new();
        let dep = fixture.root().join("node_modules/x/index.js");
        fs::write(&dep, "dep").unwrap();
        let lock = fixture.root().join("yarn.lock");
        fs::write(&lock, "lock").unwrap();

        assert!(fixture.event(EventKind::Create(CreateKind::File), &[dep]).is_empty());
        assert!(fixture.event(EventKind::Create(CreateKind::File), &[lock]).is_empty());
    }

    #[test]
    fn test_vanished_file_is_dropped() {
        let mut fixture = Fixture::new();
        let ghost = fixture.root().join("ghost.js");

        assert!(fixture.event(modify(), &[ghost]).is_empty());
    }

    #[test]
    fn test_metadata_only_is_ignored() {
        let mut fixture = Fixture::new();
        let app = fixture.root().join("src/App.js");
        let events = fixture.event(
            EventKind::Modify(ModifyKind::Metadata(notify::event::MetadataKind::Any)),
            &[app],
        );
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_start_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = ChangeWatcher::start(dir.path().join("missing"), Arc::new(IgnoreRules::default())).await;
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_start_reports_summary() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("index.js"), "x").unwrap();

        let (watcher, _rx) = ChangeWatcher::start(root.clone(), Arc::new(IgnoreRules::default()))
            .await
            .unwrap();
        assert_eq!(watcher.root(), root.as_path());
        assert_eq!(watcher.summary().files, 1);
    }

    #[test]
    fn test_ignored_name_applies_to_directories_too() {
        let mut fixture = Fixture::new();
        let backup = fixture.root().join("backup~");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("old.js"), "x").unwrap();

        let created = fixture.event(EventKind::Create(CreateKind::Folder), &[backup.clone()]);
        assert!(created.is_empty());
        let nested = fixture.event(EventKind::Create(CreateKind::File), &[backup.join("old.js")]);
        assert!(nested.is_empty());
    }

    #[tokio::test]
    async fn test_events_queued_during_scan_are_replayed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("early.js"), "x").unwrap();

        // A removal raised before the scan finished sits in the raw queue.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        raw_tx
            .send(Ok(Event::new(EventKind::Remove(RemoveKind::File))
                .add_path(root.join("early.js"))))
            .unwrap();
        drop(raw_tx);

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();
        let scan_root = root.clone();
        let worker = std::thread::spawn(move || {
            run_classifier(scan_root, Arc::new(IgnoreRules::default()), raw_rx, tx, ready_tx)
        });

        assert_eq!(ready_rx.await.unwrap().files, 1);
        assert_eq!(
            rx.recv().await,
            Some(ChangeEvent::Unlink {
                path: "/early.js".into()
            })
        );
        assert_eq!(rx.recv().await, None);
        worker.join().unwrap();
    }

    #[tokio::test]
    async fn test_start_reports_new_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let (_watcher, mut rx) = ChangeWatcher::start(root.clone(), Arc::new(IgnoreRules::default()))
            .await
            .unwrap();
        fs::write(root.join("late.js"), "y").unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.path(), "/late.js");
    }
}
