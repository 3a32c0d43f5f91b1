//! File records and project snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a file's content is carried in [`FileRecord::code`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Plain UTF-8 text
    #[default]
    Utf8,
    /// `data:<mime>;base64,<payload>` URL for binary content
    Base64DataUrl,
}

/// A single file addressed by its virtual path.
///
/// On the wire this is `{ "code": ..., "path": ... }`. The encoding is not
/// transmitted; a receiver that needs it can tell from the `data:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File content, text or data URL depending on `encoding`
    pub code: String,

    /// Root-relative POSIX path, always starting with `/`
    pub path: String,

    #[serde(skip)]
    pub encoding: Encoding,
}

impl FileRecord {
    /// Create a UTF-8 text record.
    pub fn text(path: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            path: path.into(),
            encoding: Encoding::Utf8,
        }
    }

    /// Create a record whose content is already a base64 data URL.
    pub fn data_url(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            code: url.into(),
            path: path.into(),
            encoding: Encoding::Base64DataUrl,
        }
    }

    /// Check whether the content is binary carried as a data URL.
    pub fn is_binary(&self) -> bool {
        self.encoding == Encoding::Base64DataUrl
    }
}

/// Check that `path` is a well-formed virtual path.
///
/// Virtual paths start with `/`, use forward slashes only, and contain no
/// empty, `.` or `..` segments.
pub fn is_virtual_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };

    !rest.is_empty()
        && !rest.contains('\\')
        && rest
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Complete file set of a project directory at one instant.
///
/// Keyed by virtual path. A `BTreeMap` keeps serialization order stable so two
/// snapshots of the same tree produce identical INIT payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, keyed by its own path.
    ///
    /// Returns the previous record for that path, if any.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(record.path.clone(), record)
    }

    /// Look up a record by virtual path.
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// Check if a path is present.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the snapshot has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over virtual paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Iterate over records in path order.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_path_validation() {
        assert!(is_virtual_path("/src/App.js"));
        assert!(is_virtual_path("/package.json"));

        assert!(!is_virtual_path("src/App.js"));
        assert!(!is_virtual_path("/"));
        assert!(!is_virtual_path("/src//App.js"));
        assert!(!is_virtual_path("/src/../secret"));
        assert!(!is_virtual_path("/src\\App.js"));
    }

    #[test]
    fn test_file_record_wire_shape() {
        let record = FileRecord::text("/src/App.js", "A");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json, serde_json::json!({ "code": "A", "path": "/src/App.js" }));
    }

    #[test]
    fn test_snapshot_serializes_as_path_map() {
        let snapshot: Snapshot = vec![
            FileRecord::text("/src/App.js", "A"),
            FileRecord::text("/package.json", "{}"),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["/src/App.js"]["code"], "A");
        assert_eq!(json["/package.json"]["code"], "{}");
        assert_eq!(snapshot.paths().collect::<Vec<_>>(), vec!["/package.json", "/src/App.js"]);
    }

    #[test]
    fn test_snapshot_insert_replaces() {
        let mut snapshot = Snapshot::new();
        assert!(snapshot.insert(FileRecord::text("/a.js", "1")).is_none());

        let previous = snapshot.insert(FileRecord::text("/a.js", "2"));
        assert_eq!(previous.map(|r| r.code), Some("1".to_string()));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("/a.js").map(|r| r.code.as_str()), Some("2"));
    }

    #[test]
    fn test_data_url_record_is_binary() {
        let record = FileRecord::data_url("/logo.png", "data:image/png;base64,AAAA");
        assert!(record.is_binary());
        assert!(!FileRecord::text("/a.js", "").is_binary());
    }
}
