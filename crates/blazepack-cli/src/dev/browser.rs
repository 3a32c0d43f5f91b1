//! Opening the dev server URL in a browser.

use std::process::Command;

/// Which browser to launch once the server is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserTarget {
    /// The system's default browser
    Default,
    /// A browser application by name
    Named(String),
    /// Do not open anything
    Suppressed,
}

impl BrowserTarget {
    /// Interpret the `browser` setting: unset, `none`, or an application name.
    pub fn from_option(browser: Option<&str>) -> Self {
        match browser.map(str::trim) {
            None | Some("") => BrowserTarget::Default,
            Some(name) if name.eq_ignore_ascii_case("none") => BrowserTarget::Suppressed,
            Some(name) => BrowserTarget::Named(name.to_string()),
        }
    }

    /// Platform command that opens `url`, or `None` when suppressed.
    pub fn command(&self, url: &str) -> Option<Command> {
        let command = match self {
            BrowserTarget::Suppressed => return None,
            BrowserTarget::Default => {
                if cfg!(target_os = "macos") {
                    let mut cmd = Command::new("open");
                    cmd.arg(url);
                    cmd
                } else if cfg!(target_os = "windows") {
                    let mut cmd = Command::new("cmd");
                    cmd.args(["/C", "start", url]);
                    cmd
                } else {
                    let mut cmd = Command::new("xdg-open");
                    cmd.arg(url);
                    cmd
                }
            }
            BrowserTarget::Named(name) => {
                if cfg!(target_os = "macos") {
                    let mut cmd = Command::new("open");
                    cmd.args(["-a", name, url]);
                    cmd
                } else if cfg!(target_os = "windows") {
                    let mut cmd = Command::new("cmd");
                    cmd.args(["/C", "start", name, url]);
                    cmd
                } else {
                    let mut cmd = Command::new(name);
                    cmd.arg(url);
                    cmd
                }
            }
        };
        Some(command)
    }

    /// Launch the browser. Failure is reported as a warning only.
    pub fn open(&self, url: &str) {
        let Some(mut command) = self.command(url) else {
            return;
        };

        match command.spawn() {
            Ok(_) => tracing::debug!(url, browser = ?self, "Opened browser"),
            Err(e) => crate::ui::warning(&format!("Failed to open browser: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        assert_eq!(BrowserTarget::from_option(None), BrowserTarget::Default);
        assert_eq!(BrowserTarget::from_option(Some("none")), BrowserTarget::Suppressed);
        assert_eq!(BrowserTarget::from_option(Some("NONE")), BrowserTarget::Suppressed);
        assert_eq!(
            BrowserTarget::from_option(Some("firefox")),
            BrowserTarget::Named("firefox".to_string())
        );
    }

    #[test]
    fn test_suppressed_has_no_command() {
        assert!(BrowserTarget::Suppressed
            .command("http://localhost:3000")
            .is_none());
    }

    #[test]
    fn test_named_command_passes_url() {
        let command = BrowserTarget::Named("firefox".to_string())
            .command("http://localhost:3000")
            .unwrap();
        let args: Vec<_> = command.get_args().collect();
        assert!(args.iter().any(|a| *a == "http://localhost:3000"));
    }

    #[test]
    fn test_suppressed_open_is_noop() {
        BrowserTarget::Suppressed.open("http://localhost:3000");
    }
}
