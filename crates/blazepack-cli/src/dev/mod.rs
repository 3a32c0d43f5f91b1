//! The dev server: snapshot reading, change watching, the session that keeps
//! browsers in sync, and the HTTP/WebSocket transport.
//!
//! Data flows one way:
//!
//! ```text
//! ChangeWatcher ──ChangeEvent──▶ SessionServer ──PATCH──▶ every client queue
//!                                     ▲  │
//!                     connect/report  │  └──INIT (snapshot)──▶ new client
//!                                     │
//!                                  server.rs (one socket task per browser)
//! ```

pub mod assets;
pub mod browser;
pub mod ignore;
pub mod mime;
pub mod proxy;
pub mod registry;
pub mod server;
pub mod session;
pub mod snapshot;
pub mod template;
pub mod watcher;

// Re-exports
pub use assets::{AssetSource, ContentServer};
pub use browser::BrowserTarget;
pub use ignore::IgnoreRules;
pub use registry::{load_registries, NpmRegistry, RegistryProxy};
pub use server::{router, AppState, DevServer, SESSION_PATH};
pub use session::{
    ClientId, Connection, SessionExit, SessionHandle, SessionOptions, SessionPhase, SessionServer,
    SnapshotPolicy,
};
pub use snapshot::{read_snapshot, read_snapshot_async};
pub use template::detect_template;
pub use watcher::{ChangeWatcher, EventClassifier, ScanSummary};
