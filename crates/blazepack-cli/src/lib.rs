//! Blazepack - a local dev server for an in-browser bundler.
//!
//! The server mirrors a project directory into a bundler running in the
//! browser. Each page gets the whole project once (INIT) and then every file
//! change as it happens (PATCH). Pages report bundler errors back; a fatal
//! one stops the server.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing
//! - [`commands`] - The `start` command
//! - [`config`] - `blazepack.config.json`, `BLAZEPACK_*` and CLI flag layering
//! - [`dev`] - Snapshot reader, change watcher, session and HTTP/WebSocket transport
//! - [`error`] - Error types and miette diagnostics
//! - [`logger`] - `tracing` setup
//! - [`ui`] - Terminal status lines and spinners
//!
//! # Example
//!
//! ```rust,no_run
//! use blazepack_cli::{dev, IgnoreRules, Result};
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let snapshot = dev::read_snapshot(Path::new("."), &IgnoreRules::default())?;
//!     println!("{} files", snapshot.len());
//!     Ok(())
//! }
//! ```

// Public modules
pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use dev::IgnoreRules;
pub use error::{CliError, ConfigError, Result, ResultExt, SnapshotError};
