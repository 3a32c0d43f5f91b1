//! Reads a project directory into a [`Snapshot`].
//!
//! Text files are stored verbatim. Binary files (selected by extension) and
//! text files that are not valid UTF-8 are stored as base64 data URLs.

use super::ignore::IgnoreRules;
use super::mime;
use crate::error::SnapshotError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use blazepack_protocol::{FileRecord, Snapshot};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// MIME type for text files whose bytes are not UTF-8.
const UNKNOWN_BINARY_MIME: &str = "application/octet-stream";

/// Virtual path of `path` relative to `root`.
///
/// Always starts with `/` and uses `/` separators. Returns `None` for paths
/// outside the root and for the root itself.
pub fn virtual_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                out.push('/');
                out.push_str(&name.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Encode raw file bytes the way they travel to the browser.
pub fn encode_content(virtual_path: &str, bytes: Vec<u8>) -> FileRecord {
    if let Some(mime) = mime::binary_mime(virtual_path) {
        return FileRecord::data_url(virtual_path, data_url(mime, &bytes));
    }

    match String::from_utf8(bytes) {
        Ok(text) => FileRecord::text(virtual_path, text),
        Err(err) => {
            let bytes = err.into_bytes();
            FileRecord::data_url(virtual_path, data_url(UNKNOWN_BINARY_MIME, &bytes))
        }
    }
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Read one file into a record.
pub fn read_record(root: &Path, path: &Path) -> std::io::Result<Option<FileRecord>> {
    let Some(virtual_path) = virtual_path(root, path) else {
        return Ok(None);
    };
    let bytes = std::fs::read(path)?;
    Ok(Some(encode_content(&virtual_path, bytes)))
}

/// Read every non-ignored file under `root`.
///
/// Any failure fails the whole snapshot; there is no partial result.
pub fn read_snapshot(root: &Path, rules: &IgnoreRules) -> Result<Snapshot, SnapshotError> {
    if !root.is_dir() {
        return Err(SnapshotError::RootNotFound(root.to_path_buf()));
    }

    let mut snapshot = Snapshot::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .path()
                    .strip_prefix(root)
                    .map(|rel| !rules.is_ignored(rel))
                    .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|source| SnapshotError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        // Symlinks count when they resolve to a regular file
        if !entry.path().is_file() {
            continue;
        }

        let path = entry.path();
        let record = read_record(root, path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(record) = record {
            snapshot.insert(record);
        }
    }

    tracing::debug!(root = %root.display(), files = snapshot.len(), "Snapshot read");
    Ok(snapshot)
}

/// Run [`read_snapshot`] on the blocking pool.
pub async fn read_snapshot_async(
    root: PathBuf,
    rules: Arc<IgnoreRules>,
) -> Result<Snapshot, SnapshotError> {
    tokio::task::spawn_blocking(move || read_snapshot(&root, &rules))
        .await
        .map_err(|e| SnapshotError::Join(e.to_string()))?
}
