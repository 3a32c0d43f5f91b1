//! Spinner shown while the watcher performs its initial scan.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Spinner for tasks without known duration.
///
/// Hidden when stderr is not a terminal or when running in CI, so logs stay
/// free of control sequences.
///
/// ```no_run
/// use blazepack_cli::ui::Spinner;
///
/// let spinner = Spinner::new("Scanning project...");
/// spinner.finish("Scanned 42 files");
/// ```
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create and start a new spinner.
    pub fn new(message: &str) -> Self {
        if super::is_ci() || !console::user_attended_stderr() {
            let pb = ProgressBar::hidden();
            pb.set_message(message.to_string());
            return Self { pb };
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.yellow} {msg}") {
            pb.set_style(style.tick_strings(&["⚡", "⚡", " ", " "]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));

        Self { pb }
    }

    /// Update the message while running.
    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Finish with a green check.
    pub fn finish(&self, message: &str) {
        if self.pb.is_hidden() {
            super::success(message);
        } else {
            self.pb
                .finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Finish with a red cross.
    pub fn fail(&self, message: &str) {
        if self.pb.is_hidden() {
            super::error(message);
        } else {
            self.pb
                .finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }
}
