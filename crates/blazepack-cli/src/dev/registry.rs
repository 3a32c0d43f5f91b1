//! Private npm registries.
//!
//! The browser bundler resolves scoped packages through `/npm/...` on the dev
//! server. Requests for a scope configured in `.npmrc` are forwarded to that
//! registry with its auth token, so credentials never leave this machine.

use super::proxy::Upstream;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Route prefix handled by [`RegistryProxy::respond`].
pub const NPM_PREFIX: &str = "/npm/";

/// One registry from `.npmrc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRegistry {
    /// Base URL
    pub registry: String,
    /// Scopes routed to this registry, without the leading `@`
    pub scopes: Vec<String>,
    /// `_authToken` / `_auth` value for the registry host
    pub token: Option<String>,
}

impl NpmRegistry {
    fn host(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.registry).ok()?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    fn matches_auth_key(&self, key: &str) -> bool {
        let Some(host) = self.host() else {
            return false;
        };
        let without_scheme = self
            .registry
            .split_once("//")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.registry)
            .trim_end_matches('/');
        key == host || key == without_scheme
    }
}

/// Parse `.npmrc` text into registries.
///
/// Scoped registries pointing at the same URL are merged. Auth lines are
/// attached regardless of where they appear in the file.
pub fn parse_npmrc(text: &str) -> Vec<NpmRegistry> {
    let entries: Vec<(String, String)> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('#'))
        .filter(|line| !line.starts_with('['))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), expand_env(unquote(value.trim()))))
        .collect();

    let mut registries: Vec<NpmRegistry> = Vec::new();

    for (key, value) in &entries {
        if let Some(scope) = key
            .strip_prefix('@')
            .and_then(|rest| rest.strip_suffix(":registry"))
        {
            match registries.iter_mut().find(|r| r.registry == *value) {
                Some(existing) => existing.scopes.push(scope.to_string()),
                None => registries.push(NpmRegistry {
                    registry: value.clone(),
                    scopes: vec![scope.to_string()],
                    token: None,
                }),
            }
        } else if key == "registry" {
            registries.push(NpmRegistry {
                registry: value.clone(),
                scopes: Vec::new(),
                token: None,
            });
        }
    }

    for (key, value) in &entries {
        let Some(auth_key) = auth_key(key) else {
            continue;
        };
        for registry in registries.iter_mut().filter(|r| r.matches_auth_key(auth_key)) {
            registry.token = Some(value.clone());
        }
    }

    registries
}

/// `//host/path/:_authToken` → `host/path`.
fn auth_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix("//")?;
    let (location, field) = rest.rsplit_once("/:")?;
    matches!(field, "_authToken" | "_auth").then_some(location)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn expand_env(value: &str) -> String {
    static VAR: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").ok()) else {
        return value.to_string();
    };
    re.replace_all(value, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}

/// Load registries from the project's `.npmrc`, falling back to the user's.
///
/// A missing file yields no registries; an unreadable one is logged and
/// treated the same.
pub fn load_registries(directory: &Path) -> Vec<NpmRegistry> {
    let candidates = [
        Some(directory.join(".npmrc")),
        dirs::home_dir().map(|home| home.join(".npmrc")),
    ];

    for path in candidates.into_iter().flatten() {
        if !path.is_file() {
            continue;
        }
        return match std::fs::read_to_string(&path) {
            Ok(text) => {
                let registries = parse_npmrc(&text);
                tracing::debug!(
                    path = %path.display(),
                    registries = registries.len(),
                    "Loaded npm registries"
                );
                registries
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read .npmrc");
                Vec::new()
            }
        };
    }

    Vec::new()
}

/// Scope of a URL-encoded package name: `@acme%2fui` → `acme`.
pub fn package_scope(package: &str) -> Option<&str> {
    let scoped = package.strip_prefix('@')?;
    let lower = scoped.to_ascii_lowercase();
    let end = lower.find("%2f")?;
    Some(&scoped[..end])
}

/// Forwards `/npm/...` requests to private registries.
#[derive(Debug, Clone)]
pub struct RegistryProxy {
    client: reqwest::Client,
    registries: Vec<NpmRegistry>,
}

impl RegistryProxy {
    /// Create a proxy over `registries`.
    pub fn new(client: reqwest::Client, registries: Vec<NpmRegistry>) -> Self {
        Self { client, registries }
    }

    /// All configured scopes, flattened, for the INIT payload.
    pub fn scopes(&self) -> Vec<String> {
        self.registries
            .iter()
            .flat_map(|r| r.scopes.iter().cloned())
            .collect()
    }

    /// Registry serving `package`'s scope.
    pub fn registry_for(&self, package: &str) -> Option<&NpmRegistry> {
        let scope = package_scope(package)?;
        self.registries
            .iter()
            .find(|r| r.scopes.iter().any(|s| s == scope))
    }

    /// Answer a request for `path`, the raw URI path starting with `/npm/`.
    ///
    /// `/npm/<pkg>` returns the package document, `/npm/<pkg>/<version>` the
    /// tarball of that version. Anything that cannot be served is a 404.
    pub async fn respond(&self, path: &str) -> Response {
        let Some(rest) = path.strip_prefix(NPM_PREFIX) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        let mut parts = rest.splitn(2, '/');
        let package = parts.next().unwrap_or_default();
        let version = parts.next().filter(|v| !v.is_empty());

        let Some(registry) = self.registry_for(package) else {
            tracing::debug!(package, "No private registry for package");
            return StatusCode::NOT_FOUND.into_response();
        };

        let result = match version {
            Some(version) => self.tarball(registry, package, version).await,
            None => self.document(registry, package).await,
        };

        match result {
            Ok(upstream) if upstream.is_success() => upstream.into_response(),
            Ok(upstream) => {
                tracing::warn!(package, status = %upstream.status, "Registry request failed");
                StatusCode::NOT_FOUND.into_response()
            }
            Err(err) => {
                match version {
                    Some(version) => crate::ui::error(&format!(
                        "Unable to download tarball of npm package {}@{}: {}",
                        package, version, err
                    )),
                    None => crate::ui::error(&format!(
                        "Unable to fetch package info of {}: {}",
                        package, err
                    )),
                }
                StatusCode::NOT_FOUND.into_response()
            }
        }
    }

    async fn document(&self, registry: &NpmRegistry, package: &str) -> crate::error::Result<Upstream> {
        let url = format!("{}/{}", registry.registry.trim_end_matches('/'), package);
        Upstream::get(&self.client, &url, registry.token.as_deref()).await
    }

    async fn tarball(
        &self,
        registry: &NpmRegistry,
        package: &str,
        version: &str,
    ) -> crate::error::Result<Upstream> {
        let url = format!(
            "{}/{}/{}",
            registry.registry.trim_end_matches('/'),
            package,
            version
        );
        let manifest = Upstream::get(&self.client, &url, registry.token.as_deref()).await?;
        if !manifest.is_success() {
            return Ok(manifest);
        }

        let manifest: serde_json::Value = serde_json::from_slice(&manifest.body)?;
        let tarball = manifest["dist"]["tarball"].as_str().ok_or_else(|| {
            crate::error::CliError::Custom(format!("{}@{} has no dist.tarball", package, version))
        })?;

        Upstream::get(&self.client, tarball, registry.token.as_deref()).await
    }
}
