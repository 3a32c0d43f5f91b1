//! Error handling for the blazepack dev server.
//!
//! A small hierarchy built on `thiserror`:
//! - **Top-level errors** (`CliError`) are what commands return
//! - **Domain errors** (`ConfigError`, `SnapshotError`) carry detail and convert
//!   automatically via `#[from]`
//! - **Context helpers** on [`ResultExt`] attach paths and hints
//!
//! Every failure that can end the process passes through `main`, which turns it
//! into a miette report and a non-zero exit status.
//!
//! # Example
//!
//! ```rust,no_run
//! use blazepack_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Run blazepack inside a project directory")
//! }
//! ```

mod diagnostic;

pub use diagnostic::cli_error_to_miette;

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (invalid values, unreadable config file)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading the project into a snapshot failed
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// The listening port is taken
    #[error("Unable to start blazepack dev server, port {0} is already in use\n\nHint: Pass a different --port")]
    PortInUse(u16),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream HTTP errors (asset origin, npm registries)
    #[error("Proxy error: {0}")]
    Proxy(#[from] reqwest::Error),

    /// The directory does not look like a project blazepack can preview
    #[error("{0}\n\nHint: Add a sandbox.config.json with a \"template\" field, or run blazepack in a project with a package.json")]
    UnknownTemplate(String),

    /// A browser reported an unrecoverable bundler failure
    #[error("{title}: {message}")]
    BundlerCrashed {
        /// Error title reported by the browser
        title: String,
        /// Error message reported by the browser
        message: String,
    },

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// An ignore pattern is not a valid regular expression
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Regex compile error
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while reading a project directory into a snapshot.
///
/// A failure on any single file fails the whole snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The root directory is missing or not a directory
    #[error("Project directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// Walking the directory tree failed
    #[error("Failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Reading one file failed
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking snapshot task was cancelled or panicked
    #[error("Snapshot task failed: {0}")]
    Join(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn `NotFound` I/O errors into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Add a helpful hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
