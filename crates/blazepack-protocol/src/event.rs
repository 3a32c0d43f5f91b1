//! Filesystem change taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One filesystem change relayed to connected clients.
///
/// Serialized as the `data` of a PATCH message:
/// `{ "event": "change", "path": "/src/App.js", "fileContent": "..." }`.
/// Only file creations and modifications carry content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ChangeEvent {
    /// A file appeared
    Add {
        path: String,
        #[serde(rename = "fileContent")]
        content: String,
    },

    /// An existing file's content changed
    Change {
        path: String,
        #[serde(rename = "fileContent")]
        content: String,
    },

    /// A file was removed
    Unlink { path: String },

    /// A directory appeared
    AddDir { path: String },

    /// A directory was removed
    UnlinkDir { path: String },
}

/// Discriminant of a [`ChangeEvent`], for logging and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Change,
    Unlink,
    AddDir,
    UnlinkDir,
}

impl ChangeKind {
    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Change => "change",
            ChangeKind::Unlink => "unlink",
            ChangeKind::AddDir => "addDir",
            ChangeKind::UnlinkDir => "unlinkDir",
        }
    }

    /// Whether this kind concerns a directory rather than a file.
    pub fn is_directory(self) -> bool {
        matches!(self, ChangeKind::AddDir | ChangeKind::UnlinkDir)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChangeEvent {
    /// The kind of change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Add { .. } => ChangeKind::Add,
            ChangeEvent::Change { .. } => ChangeKind::Change,
            ChangeEvent::Unlink { .. } => ChangeKind::Unlink,
            ChangeEvent::AddDir { .. } => ChangeKind::AddDir,
            ChangeEvent::UnlinkDir { .. } => ChangeKind::UnlinkDir,
        }
    }

    /// Virtual path affected by this change.
    pub fn path(&self) -> &str {
        match self {
            ChangeEvent::Add { path, .. }
            | ChangeEvent::Change { path, .. }
            | ChangeEvent::Unlink { path }
            | ChangeEvent::AddDir { path }
            | ChangeEvent::UnlinkDir { path } => path,
        }
    }

    /// New file content, present only for `Add` and `Change`.
    pub fn content(&self) -> Option<&str> {
        match self {
            ChangeEvent::Add { content, .. } | ChangeEvent::Change { content, .. } => {
                Some(content)
            }
            _ => None,
        }
    }

    /// Whether the change alters the set of files rather than one file's content.
    pub fn is_structural(&self) -> bool {
        !matches!(self, ChangeEvent::Change { .. })
    }

    /// Final segment of the path (the file or directory name).
    pub fn file_name(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or(path)
    }
}
