//! JSON envelopes exchanged over the persistent connection.
//!
//! Every message is `{ "type": <TAG>, "data": <payload> }`.

use crate::event::ChangeEvent;
use crate::file::Snapshot;
use crate::DEFAULT_MANIFEST;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server to client messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Full file set, sent once right after a connection is established
    #[serde(rename = "INIT")]
    Init(InitPayload),

    /// One incremental change, broadcast to every connected client
    #[serde(rename = "PATCH")]
    Patch(ChangeEvent),
}

impl ServerMessage {
    /// Serialize to the JSON text frame sent on the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Payload of an INIT message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    /// Snapshot of the project, keyed by virtual path
    pub files: Snapshot,

    /// npm scopes served by private registries through the `/npm` proxy
    #[serde(rename = "registryScopes", default)]
    pub registry_scopes: Vec<String>,

    /// Whether the client should log its own activity
    #[serde(default)]
    pub verbose: bool,

    /// Manifest file name whose changes force a full reload
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

impl Default for InitPayload {
    fn default() -> Self {
        Self {
            files: Snapshot::default(),
            registry_scopes: Vec::new(),
            verbose: false,
            manifest: default_manifest(),
        }
    }
}

fn default_manifest() -> String {
    DEFAULT_MANIFEST.to_string()
}

/// Title and message of an error raised in the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub title: String,
    pub message: String,
}

impl ErrorReport {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Client to server messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// The in-browser bundler failed in a way the page cannot recover from.
    /// Ends the dev session.
    #[serde(rename = "UNHANDLED_SANDPACK_ERROR")]
    UnhandledSandpackError(ErrorReport),

    /// A recoverable problem worth logging on the server
    #[serde(rename = "ERROR")]
    Error(ErrorReport),
}

impl ClientMessage {
    /// Whether this report terminates the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientMessage::UnhandledSandpackError(_))
    }

    /// The carried title and message.
    pub fn report(&self) -> &ErrorReport {
        match self {
            ClientMessage::UnhandledSandpackError(report) | ClientMessage::Error(report) => report,
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
