//! Blazepack protocol - the data exchanged between the dev server and the
//! in-browser preview.
//!
//! The dev server mirrors a project directory into a browser-hosted bundler.
//! This crate holds the pieces both ends agree on:
//!
//! - [`file`] - addressable file records and the [`Snapshot`] of a project
//! - [`event`] - the closed [`ChangeEvent`] taxonomy produced by the watcher
//! - [`message`] - JSON envelopes sent over the persistent connection
//! - [`client`] - the patch rules a browser client applies to its mirror
//!
//! Nothing here performs I/O. The server side lives in `blazepack-cli`.
//!
//! # Example
//!
//! ```rust
//! use blazepack_protocol::{ChangeEvent, ServerMessage};
//!
//! let patch = ServerMessage::Patch(ChangeEvent::Change {
//!     path: "/src/App.js".to_string(),
//!     content: "B".to_string(),
//! });
//! let json = patch.to_json().unwrap();
//! assert!(json.contains(r#""type":"PATCH""#));
//! ```

pub mod client;
pub mod event;
pub mod file;
pub mod message;

pub use client::{ApplyError, Bundler, ClientMirror, PatchApplier, PatchOutcome, ReloadReason};
pub use event::{ChangeEvent, ChangeKind};
pub use file::{is_virtual_path, Encoding, FileRecord, Snapshot};
pub use message::{ClientMessage, ErrorReport, InitPayload, ServerMessage};

/// Default name of the project's dependency manifest.
pub const DEFAULT_MANIFEST: &str = "package.json";
