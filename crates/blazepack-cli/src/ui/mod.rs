//! Terminal UI utilities for status lines and spinners.
//!
//! Everything prints to stderr so stdout stays free for piping.
//!
//! # Examples
//!
//! ```no_run
//! use blazepack_cli::ui;
//!
//! let spinner = ui::Spinner::new("Scanning project...");
//! spinner.finish("Scanned 12 files");
//!
//! ui::success("Dev server running");
//! ui::error("Port already in use");
//! ```

mod messages;
mod spinner;

pub use messages::{debug, error, info, set_verbose, success, warning};
pub use spinner::Spinner;

use owo_colors::OwoColorize;

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
}

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR, then falls back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

/// Initialize color support.
///
/// `--no-color` wins over the environment.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    console::set_colors_enabled_stderr(enabled);
}

/// Render a URL the way status lines show it.
pub fn url(url: &str) -> String {
    if console::colors_enabled_stderr() {
        url.blue().underline().to_string()
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_is_ci_with_ci_var() {
        std::env::set_var("CI", "true");
        assert!(is_ci());
        std::env::remove_var("CI");
    }

    #[test]
    #[serial]
    fn test_should_use_color_no_color() {
        std::env::set_var("NO_COLOR", "1");
        std::env::remove_var("FORCE_COLOR");
        assert!(!should_use_color());
        std::env::remove_var("NO_COLOR");
    }

    #[test]
    #[serial]
    fn test_should_use_color_no_color_overrides_force() {
        std::env::set_var("NO_COLOR", "1");
        std::env::set_var("FORCE_COLOR", "1");
        assert!(!should_use_color());
        std::env::remove_var("NO_COLOR");
        std::env::remove_var("FORCE_COLOR");
    }

    #[test]
    #[serial]
    fn test_url_plain_without_colors() {
        init_colors(true);
        assert_eq!(url("http://localhost:3000"), "http://localhost:3000");
    }
}
