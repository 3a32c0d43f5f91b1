//! Browser-side patch rules.
//!
//! A client keeps a [`ClientMirror`] of the project, seeded by INIT and kept
//! current by PATCH messages. The bundler is always handed the full mirror.
//! Whether a patch can be applied in place or needs a fresh page is decided
//! by [`PatchApplier`]:
//!
//! - any change to the set of files or directories forces a reload, since the
//!   bundler's module graph cannot add or drop entries incrementally
//! - a change to the dependency manifest forces a reload
//! - a content change to an existing file updates the mirror and re-bundles
//!
//! Failures while applying or bundling are turned into an
//! `UNHANDLED_SANDPACK_ERROR` report for the server instead of being dropped.

use crate::event::{ChangeEvent, ChangeKind};
use crate::file::Snapshot;
use crate::message::{ClientMessage, ErrorReport, ServerMessage};
use crate::DEFAULT_MANIFEST;
use std::collections::BTreeMap;
use thiserror::Error;

/// Client-side copy of the project's files: virtual path to content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMirror {
    files: BTreeMap<String, String>,
}

impl ClientMirror {
    /// Seed a mirror from an INIT snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            files: snapshot
                .records()
                .map(|record| (record.path.clone(), record.code.clone()))
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All files, in path order.
    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// Apply one change to the mirror contents.
    ///
    /// After this, `get(path)` returns the new content for `Add`/`Change`, and
    /// nothing for `Unlink`. `UnlinkDir` drops every file below the directory.
    /// `AddDir` has no file content to record.
    pub fn apply(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::Add { path, content } | ChangeEvent::Change { path, content } => {
                self.files.insert(path.clone(), content.clone());
            }
            ChangeEvent::Unlink { path } => {
                self.files.remove(path);
            }
            ChangeEvent::UnlinkDir { path } => {
                let prefix = format!("{}/", path.trim_end_matches('/'));
                self.files.retain(|file, _| !file.starts_with(&prefix));
            }
            ChangeEvent::AddDir { .. } => {}
        }
    }
}

/// The in-browser bundler as seen by the patch applier.
pub trait Bundler {
    type Error: std::fmt::Display;

    /// Compile the complete mirror.
    ///
    /// `initial` is true for the compile that follows INIT.
    fn compile(&mut self, files: &ClientMirror, initial: bool) -> Result<(), Self::Error>;
}

/// Why a patch could not be applied in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    /// A file or directory was added or removed
    Structural(ChangeKind),
    /// The dependency manifest changed
    ManifestChanged,
}

/// Result of handling one server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// INIT stored and compiled
    Initialized { files: usize },
    /// Mirror updated for `path` and recompiled
    Rebundled { path: String },
    /// The page must reload; the mirror was left untouched
    Reload(ReloadReason),
    /// Something failed; the report must be sent to the server
    Failed(ClientMessage),
}

/// Errors raised while applying a message.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// PATCH arrived before any INIT
    #[error("received a patch for {0} before the initial file set")]
    NotInitialized(String),

    /// The frame was not a valid server message
    #[error("malformed server message: {0}")]
    Decode(#[from] serde_json::Error),

    /// The bundler rejected the mirror
    #[error("{0}")]
    Bundler(String),
}

impl ApplyError {
    fn title(&self) -> &'static str {
        match self {
            ApplyError::NotInitialized(_) => "Out of order patch",
            ApplyError::Decode(_) => "Invalid message",
            ApplyError::Bundler(_) => "Bundler error",
        }
    }

    /// Convert into the fatal report sent back to the server.
    pub fn into_report(self) -> ClientMessage {
        ClientMessage::UnhandledSandpackError(ErrorReport::new(self.title(), self.to_string()))
    }
}

/// Applies INIT and PATCH messages to a mirror and drives the bundler.
pub struct PatchApplier<B> {
    bundler: B,
    mirror: Option<ClientMirror>,
    manifest: String,
}

impl<B: Bundler> PatchApplier<B> {
    /// Create an applier that treats `package.json` as the manifest.
    pub fn new(bundler: B) -> Self {
        Self::with_manifest(bundler, DEFAULT_MANIFEST)
    }

    /// Create an applier with a custom manifest file name.
    pub fn with_manifest(bundler: B, manifest: impl Into<String>) -> Self {
        Self {
            bundler,
            mirror: None,
            manifest: manifest.into(),
        }
    }

    /// Current mirror, once INIT has been received.
    pub fn mirror(&self) -> Option<&ClientMirror> {
        self.mirror.as_ref()
    }

    pub fn bundler(&self) -> &B {
        &self.bundler
    }

    /// Handle a raw text frame from the server.
    pub fn handle_text(&mut self, text: &str) -> PatchOutcome {
        match ServerMessage::from_json(text) {
            Ok(message) => self.handle(message),
            Err(e) => PatchOutcome::Failed(ApplyError::from(e).into_report()),
        }
    }

    /// Handle a decoded server message.
    pub fn handle(&mut self, message: ServerMessage) -> PatchOutcome {
        let result = match message {
            ServerMessage::Init(payload) => {
                if !payload.manifest.is_empty() {
                    self.manifest = payload.manifest;
                }
                self.initialize(&payload.files)
            }
            ServerMessage::Patch(event) => self.patch(event),
        };

        result.unwrap_or_else(|e| {
            tracing::debug!("patch failed: {}", e);
            PatchOutcome::Failed(e.into_report())
        })
    }

    fn initialize(&mut self, files: &Snapshot) -> Result<PatchOutcome, ApplyError> {
        let mirror = ClientMirror::from_snapshot(files);
        let count = mirror.len();
        let mirror = self.mirror.insert(mirror);

        self.bundler
            .compile(mirror, true)
            .map_err(|e| ApplyError::Bundler(e.to_string()))?;

        Ok(PatchOutcome::Initialized { files: count })
    }

    fn patch(&mut self, event: ChangeEvent) -> Result<PatchOutcome, ApplyError> {
        if let Some(reason) = self.reload_reason(&event) {
            return Ok(PatchOutcome::Reload(reason));
        }

        let Some(mirror) = self.mirror.as_mut() else {
            return Err(ApplyError::NotInitialized(event.path().to_string()));
        };

        mirror.apply(&event);
        self.bundler
            .compile(mirror, false)
            .map_err(|e| ApplyError::Bundler(e.to_string()))?;

        Ok(PatchOutcome::Rebundled {
            path: event.path().to_string(),
        })
    }

    /// Decide whether `event` needs a full page reload.
    pub fn reload_reason(&self, event: &ChangeEvent) -> Option<ReloadReason> {
        if event.is_structural() {
            return Some(ReloadReason::Structural(event.kind()));
        }

        if event.file_name() == self.manifest {
            return Some(ReloadReason::ManifestChanged);
        }

        None
    }
}
