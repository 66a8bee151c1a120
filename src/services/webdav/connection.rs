use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use tracing::debug;

use crate::errors::{DavError, DavResult};
use super::config::WebDAVConfig;
use super::url_management::WebDAVUrlManager;

/// Status and body of one completed request
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Byte-level request primitive a session drives.
///
/// `path` is already normalized and percent-encoded. Any HTTP status counts
/// as a completed request; only failures to get a status at all (connect,
/// TLS, timeout) are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, path: &str, headers: HeaderMap) -> DavResult<TransportResponse>;
}

/// reqwest-backed transport bound to a single origin
pub struct HttpTransport {
    client: Client,
    origin: String,
}

impl HttpTransport {
    pub fn new(config: &WebDAVConfig) -> DavResult<Self> {
        config.validate()?;
        let urls = WebDAVUrlManager::from_url(&config.server_url)?;

        // One idle connection: a session never has two requests in flight
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self {
            client,
            origin: urls.origin().to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: Method, path: &str, headers: HeaderMap) -> DavResult<TransportResponse> {
        let url = format!("{}{}", self.origin, path);
        debug!("{} {}", method, url);

        let response = self.client
            .request(method, &url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!("{} -> {} ({} bytes)", url, status, body.len());

        Ok(TransportResponse { status, body })
    }
}

/// PROPFIND is not one of reqwest's predefined methods
pub fn propfind_method() -> DavResult<Method> {
    Method::from_bytes(b"PROPFIND").map_err(|e| DavError::protocol(e.to_string()))
}

pub fn move_method() -> DavResult<Method> {
    Method::from_bytes(b"MOVE").map_err(|e| DavError::protocol(e.to_string()))
}
