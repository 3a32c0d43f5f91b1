//! Outbound HTTP shared by the asset origin proxy and the npm registry proxy.

use crate::error::Result;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;

const USER_AGENT: &str = concat!("blazepack/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used for every upstream request.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// A buffered upstream response.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Upstream status
    pub status: StatusCode,
    /// Upstream `Content-Type`, if any
    pub content_type: Option<HeaderValue>,
    /// Upstream `Cache-Control`, if any
    pub cache_control: Option<HeaderValue>,
    /// Full body
    pub body: Bytes,
}

impl Upstream {
    /// GET `url`, optionally with a bearer token, and buffer the body.
    pub async fn get(client: &reqwest::Client, url: &str, token: Option<&str>) -> Result<Self> {
        let mut request = client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let cache_control = response.headers().get(header::CACHE_CONTROL).cloned();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            content_type,
            cache_control,
            body,
        })
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl IntoResponse for Upstream {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = self.content_type {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        if let Some(cache_control) = self.cache_control {
            headers.insert(header::CACHE_CONTROL, cache_control);
        }
        (self.status, headers, Body::from(self.body)).into_response()
    }
}
