//! Status lines printed to stderr.

use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable [`debug`] output. Set once from `--verbose`.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Print a success message.
///
/// ```no_run
/// blazepack_cli::ui::success("Blazepack dev server running at http://localhost:3000");
/// ```
pub fn success(message: &str) {
    eprintln!("{} {}", "⚡".yellow().bold(), message);
}

/// Print an info message.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message.blue());
}

/// Print a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print a debug message, only with `--verbose`.
pub fn debug(message: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        eprintln!("{} {}", "◆".dimmed(), message.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        success("Success message");
        info("Info message");
        warning("Warning message");
        error("Error message");
        set_verbose(true);
        debug("Debug message");
        set_verbose(false);
    }
}
