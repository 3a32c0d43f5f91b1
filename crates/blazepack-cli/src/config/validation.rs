use crate::config::DevConfig;
use crate::error::{CliError, ConfigError, Result};
use std::path::{Path, PathBuf};

impl DevConfig {
    /// Resolve the project directory to an absolute, canonical path.
    ///
    /// Watcher events report canonical paths, so the root has to match them.
    pub fn resolve_directory(directory: &Path) -> Result<PathBuf> {
        if !directory.exists() {
            return Err(CliError::FileNotFound(directory.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "{} is not a directory",
                directory.display()
            )));
        }
        Ok(directory.canonicalize()?)
    }

    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                hint: "Use a port between 1 and 65535".to_string(),
            }
            .into());
        }

        if self.manifest.trim().is_empty() || self.manifest.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                field: "manifest".to_string(),
                value: self.manifest.clone(),
                hint: "Use a bare file name such as package.json".to_string(),
            }
            .into());
        }

        if let Some(browser) = &self.browser {
            if browser.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "browser".to_string(),
                    value: browser.clone(),
                    hint: "Use an application name, or \"none\"".to_string(),
                }
                .into());
            }
        }

        match &self.local_assets {
            Some(dir) if !dir.is_dir() => {
                return Err(ConfigError::InvalidValue {
                    field: "localAssets".to_string(),
                    value: dir.display().to_string(),
                    hint: "Point it at a directory containing the bundler's index.html".to_string(),
                }
                .into());
            }
            Some(_) => {}
            None => validate_origin(&self.asset_origin)?,
        }

        // Surface bad patterns now rather than at first use
        self.ignore_rules()?;

        Ok(())
    }
}

fn validate_origin(origin: &str) -> Result<()> {
    let valid = reqwest::Url::parse(origin)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false);

    if !valid {
        return Err(ConfigError::InvalidValue {
            field: "assetOrigin".to_string(),
            value: origin.to_string(),
            hint: "Use an absolute http(s) URL".to_string(),
        }
        .into());
    }
    Ok(())
}
