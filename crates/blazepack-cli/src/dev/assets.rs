//! HTTP content: the shell page, the client script, project files and the
//! browser bundler's own assets.
//!
//! Bundler assets come either from a local directory or from a remote origin
//! that is proxied. Requests that match nothing fall back to the shell page
//! so client-side routes keep working.

use super::mime;
use super::proxy::Upstream;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;
use std::path::{Component, Path, PathBuf};

/// Script served at `/index.js`; connects to the session and drives the bundler.
#[derive(RustEmbed)]
#[folder = "assets/client/"]
struct ClientAssets;

/// Path of the embedded client script.
pub const CLIENT_SCRIPT_PATH: &str = "/index.js";

const SHELL_PAGE: &str = "/index.html";
const NO_CACHE: &str = "no-cache";

/// Where the bundler's assets come from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Serve from a directory on disk
    Local(PathBuf),
    /// Proxy from a base URL
    Remote {
        /// Base URL without trailing slash
        origin: String,
        /// Shared HTTP client
        client: reqwest::Client,
    },
}

/// Serves everything that is not the session channel or the npm proxy.
#[derive(Debug, Clone)]
pub struct ContentServer {
    project_root: PathBuf,
    source: AssetSource,
    spa_fallback: bool,
}

impl ContentServer {
    /// Create a content server for `project_root`.
    pub fn new(project_root: PathBuf, source: AssetSource, spa_fallback: bool) -> Self {
        let source = match source {
            AssetSource::Remote { origin, client } => AssetSource::Remote {
                origin: origin.trim_end_matches('/').to_string(),
                client,
            },
            local => local,
        };
        Self {
            project_root,
            source,
            spa_fallback,
        }
    }

    /// The embedded client script.
    pub fn client_script() -> Response {
        match ClientAssets::get("index.js") {
            Some(file) => (
                [
                    (header::CONTENT_TYPE, "text/javascript"),
                    (header::CACHE_CONTROL, NO_CACHE),
                ],
                Body::from(file.data.into_owned()),
            )
                .into_response(),
            None => {
                tracing::error!("Client script missing from the binary");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    /// Answer a GET for `path`.
    pub async fn serve(&self, path: &str) -> Response {
        if path == "/" || mime::extension(path).is_none() {
            return self.shell().await;
        }

        let Some(relative) = safe_relative(path) else {
            tracing::debug!(path, "Rejected path outside the project");
            return StatusCode::NOT_FOUND.into_response();
        };

        let public = self.project_root.join("public").join(&relative);
        let project = self.project_root.join(&relative);
        for candidate in [public, project] {
            if let Some(response) = read_file(&candidate, path).await {
                return response;
            }
        }

        if let Some(response) = self.bundler_asset(path, &relative).await {
            return response;
        }

        if self.spa_fallback {
            self.shell().await
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }

    /// The bundler's shell page, never cached.
    pub async fn shell(&self) -> Response {
        let response = match &self.source {
            AssetSource::Local(dir) => read_file(&dir.join("index.html"), SHELL_PAGE).await,
            AssetSource::Remote { origin, client } => {
                let url = format!("{}{}", origin, SHELL_PAGE);
                match Upstream::get(client, &url, None).await {
                    Ok(upstream) if upstream.is_success() => Some(html(upstream.body.into())),
                    Ok(upstream) => {
                        tracing::warn!(%url, status = %upstream.status, "Shell page unavailable");
                        None
                    }
                    Err(err) => {
                        tracing::warn!(%url, error = %err, "Failed to fetch shell page");
                        None
                    }
                }
            }
        };

        let mut response = response.unwrap_or_else(|| StatusCode::NOT_FOUND.into_response());
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        response
    }

    async fn bundler_asset(&self, path: &str, relative: &Path) -> Option<Response> {
        match &self.source {
            AssetSource::Local(dir) => read_file(&dir.join(relative), path).await,
            AssetSource::Remote { origin, client } => {
                let url = format!("{}{}", origin, path);
                match Upstream::get(client, &url, None).await {
                    Ok(mut upstream) if upstream.is_success() => {
                        if upstream.content_type.is_none() {
                            upstream.content_type =
                                Some(HeaderValue::from_static(mime::content_type(path)));
                        }
                        Some(upstream.into_response())
                    }
                    Ok(upstream) => {
                        tracing::debug!(%url, status = %upstream.status, "Asset not found upstream");
                        None
                    }
                    Err(err) => {
                        tracing::warn!(%url, error = %err, "Failed to proxy asset");
                        None
                    }
                }
            }
        }
    }
}

/// Root-relative filesystem path for a URL path, or `None` if it escapes.
fn safe_relative(path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => out.push(name),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

async fn read_file(file: &Path, url_path: &str) -> Option<Response> {
    if !file.is_file() {
        return None;
    }
    match tokio::fs::read(file).await {
        Ok(content) => Some(
            (
                [
                    (header::CONTENT_TYPE, mime::content_type(url_path)),
                    (header::CACHE_CONTROL, NO_CACHE),
                ],
                Body::from(content),
            )
                .into_response(),
        ),
        Err(err) => {
            tracing::warn!(path = %file.display(), error = %err, "Failed to read file");
            None
        }
    }
}

fn html(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn local_server(fallback: bool) -> (TempDir, TempDir, ContentServer) {
        let project = TempDir::new().unwrap();
        let www = TempDir::new().unwrap();
        fs::write(www.path().join("index.html"), "<html>shell</html>").unwrap();
        let server = ContentServer::new(
            project.path().to_path_buf(),
            AssetSource::Local(www.path().to_path_buf()),
            fallback,
        );
        (project, www, server)
    }

    #[test]
    fn test_safe_relative() {
        assert_eq!(safe_relative("/logo.svg"), Some(PathBuf::from("logo.svg")));
        assert_eq!(
            safe_relative("/static/js/app.js"),
            Some(PathBuf::from("static/js/app.js"))
        );
        assert_eq!(safe_relative("/../etc/passwd"), None);
        assert_eq!(safe_relative("/a/../../b.js"), None);
        assert_eq!(safe_relative("/"), None);
    }

    #[tokio::test]
    async fn test_root_serves_shell() {
        let (_project, _www, server) = local_server(true);
        let response = server.serve("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(body_string(response).await, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_extensionless_path_serves_shell() {
        let (_project, _www, server) = local_server(false);
        let response = server.serve("/settings/profile").await;
        assert_eq!(body_string(response).await, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_public_wins_over_project_root() {
        let (project, _www, server) = local_server(true);
        fs::create_dir_all(project.path().join("public")).unwrap();
        fs::write(project.path().join("public/logo.svg"), "<svg>public</svg>").unwrap();
        fs::write(project.path().join("logo.svg"), "<svg>root</svg>").unwrap();

        let response = server.serve("/logo.svg").await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(body_string(response).await, "<svg>public</svg>");
    }

    #[tokio::test]
    async fn test_project_file() {
        let (project, _www, server) = local_server(true);
        fs::write(project.path().join("data.json"), "{}").unwrap();

        let response = server.serve("/data.json").await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_string(response).await, "{}");
    }

    #[tokio::test]
    async fn test_local_bundler_asset() {
        let (_project, www, server) = local_server(true);
        fs::create_dir_all(www.path().join("static/js")).unwrap();
        fs::write(www.path().join("static/js/sandbox.js"), "sandbox()").unwrap();

        let response = server.serve("/static/js/sandbox.js").await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/javascript");
        assert_eq!(body_string(response).await, "sandbox()");
    }

    #[tokio::test]
    async fn test_missing_asset_fallback() {
        let (_project, _www, server) = local_server(true);
        let response = server.serve("/missing.js").await;
        assert_eq!(body_string(response).await, "<html>shell</html>");

        let (_project, _www, server) = local_server(false);
        let response = server.serve("/missing.js").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (_project, _www, server) = local_server(true);
        let response = server.serve("/../secret.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("locked.js");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&file).is_ok() {
            // Running as root; permissions are not enforced
            return;
        }

        assert!(read_file(&file, "/locked.js").await.is_none());
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn test_client_script_is_embedded() {
        let response = ContentServer::client_script();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/javascript");
    }
}
