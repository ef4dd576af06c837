//! Image download for `upload` actions.

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::FilePayload;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::debug;

use crate::errors::ActionError;

/// URL to file bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FilePayload, ActionError>;
}

/// Fetches images over HTTP(S) with a per-request timeout.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ActionError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("relist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ActionError::Internal(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FilePayload, ActionError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ActionError::Fetch(format!("invalid url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ActionError::Fetch(format!("unsupported scheme in '{url}'")));
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| ActionError::Fetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ActionError::Fetch(format!("HTTP {status} for {url}")));
        }

        let header_mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"));
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ActionError::Fetch(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ActionError::Fetch(format!("empty body for {url}")));
        }

        let name = file_name(&parsed);
        let mime = header_mime.unwrap_or_else(|| mime_from_name(&name).to_string());
        debug!(url, size = bytes.len(), %mime, "image fetched");
        Ok(FilePayload {
            name,
            mime,
            bytes: bytes.to_vec(),
        })
    }
}

fn file_name(url: &url::Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image");
    if last.contains('.') {
        last.to_string()
    } else {
        format!("{last}.jpg")
    }
}

fn mime_from_name(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}
