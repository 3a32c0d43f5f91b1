//! Dev server configuration with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and
//! `blazepack.config.json` in the project directory.
//! Priority: CLI > Environment > File > Defaults

mod defaults;
mod loading;
mod validation;

use crate::dev::{AssetSource, BrowserTarget, IgnoreRules, SnapshotPolicy};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub use defaults::*;
pub use loading::CliOverrides;

/// Config file looked up in the project directory.
pub const CONFIG_FILE: &str = "blazepack.config.json";

/// Dev server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DevConfig {
    /// Project directory, canonicalized once loaded
    #[serde(skip)]
    pub directory: PathBuf,

    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listening address
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Browser to open: unset for the system default, `none` to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Base URL the bundler's own assets are proxied from
    #[serde(default = "default_asset_origin")]
    pub asset_origin: String,

    /// Serve the bundler's assets from this directory instead of proxying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_assets: Option<PathBuf>,

    /// Manifest file name whose changes force a full reload
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// How INIT snapshots are produced
    #[serde(default)]
    pub snapshot_policy: SnapshotPolicy,

    /// Serve the shell page for paths that match nothing
    #[serde(default = "default_spa_fallback")]
    pub spa_fallback: bool,

    /// Extra ignore patterns
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Extra ignore patterns, appended to the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IgnoreConfig {
    /// Regexes matched against directory names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<String>,

    /// Regexes matched against file names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            port: default_port(),
            host: default_host(),
            browser: None,
            asset_origin: default_asset_origin(),
            local_assets: None,
            manifest: default_manifest(),
            snapshot_policy: SnapshotPolicy::default(),
            spa_fallback: default_spa_fallback(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl DevConfig {
    /// Socket address to bind.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// URL printed and opened in the browser.
    pub fn server_url(&self) -> String {
        if self.host.is_loopback() || self.host.is_unspecified() {
            format!("http://localhost:{}", self.port)
        } else {
            format!("http://{}", self.addr())
        }
    }

    /// Build the ignore rules shared by the snapshot reader and the watcher.
    pub fn ignore_rules(&self) -> Result<IgnoreRules> {
        Ok(IgnoreRules::with_extra(
            &self.ignore.directories,
            &self.ignore.files,
        )?)
    }

    /// Where the bundler's assets are served from.
    pub fn asset_source(&self, client: reqwest::Client) -> AssetSource {
        match &self.local_assets {
            Some(dir) => AssetSource::Local(dir.clone()),
            None => AssetSource::Remote {
                origin: self.asset_origin.clone(),
                client,
            },
        }
    }

    /// Which browser to open, if any.
    pub fn browser_target(&self) -> BrowserTarget {
        BrowserTarget::from_option(self.browser.as_deref())
    }
}
