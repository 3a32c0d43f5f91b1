use crate::cli::StartArgs;
use crate::config::{DevConfig, CONFIG_FILE};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Fields settable through `BLAZEPACK_*` variables.
const ENV_FIELDS: &[&str] = &[
    "port",
    "host",
    "browser",
    "asset_origin",
    "local_assets",
    "manifest",
    "snapshot_policy",
    "spa_fallback",
];

/// Legacy variable naming a local asset directory.
const LEGACY_LOCAL_ENV: &str = "SANDPACK_LOCAL";

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

impl From<&StartArgs> for CliOverrides {
    fn from(args: &StartArgs) -> Self {
        Self {
            port: args.port,
            browser: args.browser.clone(),
        }
    }
}

impl DevConfig {
    /// Load configuration for the `start` command and validate it.
    pub fn from_args(args: &StartArgs) -> Result<Self> {
        Self::load(&args.directory, &CliOverrides::from(args))
    }

    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    pub fn load(directory: &Path, overrides: &CliOverrides) -> Result<Self> {
        let directory = Self::resolve_directory(directory)?;

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = directory.join(CONFIG_FILE);
        if config_file.is_file() {
            tracing::debug!(path = %config_file.display(), "Loading config file");
            figment = figment.merge(Json::file(&config_file));
        }

        // BLAZEPACK_PORT, BLAZEPACK_ASSET_ORIGIN, ...
        // `lowercase(false)` must come last: `only` and `map` reset it.
        figment = figment.merge(
            Env::prefixed("BLAZEPACK_")
                .only(ENV_FIELDS)
                .map(|key| env_key_to_field(key.as_str()).into())
                .lowercase(false),
        );

        figment = figment.merge(Serialized::defaults(overrides));

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: format!("Check {} syntax and field types", CONFIG_FILE),
        })?;

        if config.local_assets.is_none() {
            config.local_assets = std::env::var_os(LEGACY_LOCAL_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from);
        }

        config.directory = directory;
        config.local_assets = config
            .local_assets
            .take()
            .map(|dir| config.directory.join(dir));

        config.validate()?;
        Ok(config)
    }
}

/// `ASSET_ORIGIN` → `assetOrigin`.
pub(crate) fn env_key_to_field(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}
