//! Logging infrastructure for the blazepack dev server.
//!
//! Structured logging on the `tracing` ecosystem. Verbosity comes from the
//! global flags, falling back to `RUST_LOG`.
//!
//! # Example
//!
//! ```rust,no_run
//! use blazepack_cli::logger::init_logger;
//! use tracing::{debug, info};
//!
//! init_logger(false, false, false);
//!
//! info!("Starting dev server");
//! debug!(path = "/src/App.js", "change detected");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "blazepack_cli=debug,blazepack_protocol=debug";
const QUIET_FILTER: &str = "blazepack_cli=error,blazepack_protocol=error";
const DEFAULT_FILTER: &str = "blazepack_cli=info,blazepack_protocol=info";

/// Initialize the tracing subscriber with the specified options.
///
/// Call once at program start, before any logging occurs.
///
/// # Verbosity Levels
///
/// 1. `--verbose`: DEBUG for blazepack crates (client payloads included)
/// 2. `--quiet`: ERROR only
/// 3. `RUST_LOG` environment variable
/// 4. Default: INFO for blazepack crates
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(build_filter(verbose, quiet), no_color);
}

/// Initialize logger with a custom environment filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // try_init: integration tests may initialize more than once per process
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_parse() {
        // Verify each directive string is accepted
        let _ = EnvFilter::new(VERBOSE_FILTER);
        let _ = EnvFilter::new(QUIET_FILTER);
        let _ = EnvFilter::new(DEFAULT_FILTER);
    }

    #[test]
    fn test_verbose_filter_enables_debug() {
        let filter = build_filter(true, false);
        assert!(filter.to_string().contains("blazepack_cli=debug"));
    }
}
