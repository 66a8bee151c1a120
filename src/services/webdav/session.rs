use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, RANGE};
use reqwest::Method;
use std::str;
use tracing::{debug, info, warn};

use crate::errors::{DavError, DavResult};
use crate::models::Props;
use crate::webdav_xml_parser::{parse_props, split_multistatus};
use super::cache::{CacheLookup, CachedBody, ResourceCache};
use super::config::WebDAVConfig;
use super::connection::{move_method, propfind_method, HttpTransport, Transport, TransportResponse};
use super::url_management::WebDAVUrlManager;

const MULTI_STATUS: u16 = 207;
const PARTIAL_CONTENT: u16 = 206;

static DEPTH: HeaderName = HeaderName::from_static("depth");
static DESTINATION: HeaderName = HeaderName::from_static("destination");
static OVERWRITE: HeaderName = HeaderName::from_static("overwrite");

/// Names produced by one directory listing, in server order.
///
/// Built from a single response; iterating again means listing again.
#[derive(Debug)]
pub struct Listing {
    names: std::vec::IntoIter<String>,
}

impl Iterator for Listing {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.names.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

impl ExactSizeIterator for Listing {}

/// A WebDAV collection seen as a read-oriented filesystem.
///
/// Every operation takes `&mut self`: one session issues one request at a
/// time and owns its property cache outright. Share a session between tasks
/// by wrapping it in a `tokio::sync::Mutex`, or open one session per worker.
pub struct WebDavSession<T: Transport = HttpTransport> {
    transport: T,
    urls: WebDAVUrlManager,
    default_headers: HeaderMap,
    cache: ResourceCache,
}

impl WebDavSession<HttpTransport> {
    /// Opens a session over HTTP(S) as selected by the URL scheme
    pub fn new(config: WebDAVConfig) -> DavResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> WebDavSession<T> {
    pub fn with_transport(config: WebDAVConfig, transport: T) -> DavResult<Self> {
        config.validate()?;
        let urls = WebDAVUrlManager::from_url(&config.server_url)?;
        let default_headers = default_headers(config.credentials())?;

        info!("Opened WebDAV session for {}{}", urls.origin(), urls.base_path());

        Ok(Self {
            transport,
            urls,
            default_headers,
            cache: ResourceCache::new(config.cache_ttl()),
        })
    }

    /// Wire path and cache key for a path relative to the session URL
    pub fn normalize_path(&self, href: &str) -> String {
        self.urls.normalize_path(href)
    }

    pub fn map_status(code: u16, href: &str) -> DavError {
        DavError::from_status(code, href)
    }

    pub async fn stat(&mut self, href: &str) -> DavResult<Props> {
        let key = self.normalize_path(href);
        self.stat_key(&key, href).await
    }

    async fn stat_key(&mut self, key: &str, href: &str) -> DavResult<Props> {
        match self.cache.get(key) {
            CacheLookup::Hit(body) => return parse_body(&body),
            CacheLookup::Failed(status) => return Err(Self::map_status(status, href)),
            CacheLookup::Miss => {}
        }

        let ttl = self.cache.ttl();
        let response = self
            .send(propfind_method()?, key, &[(&DEPTH, "0")])
            .await?;

        if response.status != MULTI_STATUS {
            warn!("PROPFIND {} failed with HTTP {}", key, response.status);
            self.cache.insert(key, CachedBody::Failed(response.status), ttl);
            return Err(Self::map_status(response.status, href));
        }

        self.cache.insert(key, CachedBody::Present(response.body.clone()), ttl);
        parse_body(&response.body)
    }

    /// Lists the names inside a collection and primes the cache with the
    /// properties of every entry, so the stats that usually follow a listing
    /// are served locally.
    pub async fn list_directory(&mut self, href: &str) -> DavResult<Listing> {
        let key = self.normalize_path(href);
        let response = self
            .send(propfind_method()?, &key, &[(&DEPTH, "1")])
            .await?;

        if response.status != MULTI_STATUS {
            warn!("Listing {} failed with HTTP {}", key, response.status);
            return Err(Self::map_status(response.status, href));
        }

        let body = str::from_utf8(&response.body)
            .map_err(|e| DavError::protocol(format!("listing body is not UTF-8: {}", e)))?;
        let entries = split_multistatus(body)?;

        let ttl = self.cache.ttl();
        let mut names = Vec::with_capacity(entries.len());

        for entry in entries {
            let child_key = self.urls.href_to_key(&entry.href);
            self.cache.insert(child_key.clone(), CachedBody::Present(Bytes::from(entry.fragment)), ttl);

            if child_key == key {
                continue;
            }
            if let Some(name) = self.urls.display_name(&entry.href) {
                names.push(name);
            }
        }

        debug!("Listed {} entries in {}", names.len(), key);
        Ok(Listing {
            names: names.into_iter(),
        })
    }

    /// Reads bytes `[start, end)` of a file, clamped to its current size.
    pub async fn read(&mut self, href: &str, start: u64, end: u64) -> DavResult<Bytes> {
        let key = self.normalize_path(href);
        let props = self.stat_key(&key, href).await?;

        let stop = end.min(props.size);
        if start >= stop {
            debug!("Empty read of {} at {}..{} (size {})", key, start, end, props.size);
            return Ok(Bytes::new());
        }

        let range = format!("bytes={}-{}", start, stop - 1);
        let response = self
            .send(Method::GET, &key, &[(&RANGE, range.as_str())])
            .await?;

        match response.status {
            PARTIAL_CONTENT => Ok(response.body),
            200 | 416 => {
                warn!("GET {} ignored {} (HTTP {})", key, range, response.status);
                Err(DavError::RangeUnsatisfiable {
                    status: response.status,
                })
            }
            status => Err(Self::map_status(status, href)),
        }
    }

    pub async fn delete(&mut self, href: &str) -> DavResult<()> {
        let key = self.normalize_path(href);
        let response = self.send(Method::DELETE, &key, &[]).await?;

        if !mutation_succeeded(response.status) {
            warn!("DELETE {} failed with HTTP {}", key, response.status);
            return Err(Self::map_status(response.status, href));
        }

        self.cache.invalidate(&key, true);
        info!("Deleted {}", key);
        Ok(())
    }

    /// Moves `src` to `dest` without overwriting an existing destination.
    /// The destination is left uncached; its next stat goes to the server.
    pub async fn move_resource(&mut self, src: &str, dest: &str) -> DavResult<()> {
        let src_key = self.normalize_path(src);
        let dest_key = self.normalize_path(dest);
        let dest_url = self.urls.url_for_key(&dest_key);

        let response = self
            .send(
                move_method()?,
                &src_key,
                &[(&DESTINATION, dest_url.as_str()), (&OVERWRITE, "F")],
            )
            .await?;

        if !mutation_succeeded(response.status) {
            warn!("MOVE {} -> {} failed with HTTP {}", src_key, dest_url, response.status);
            return Err(Self::map_status(response.status, src));
        }

        self.cache.invalidate(&src_key, true);
        self.cache.invalidate(&dest_key, false);
        info!("Moved {} -> {}", src_key, dest_url);
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        extra: &[(&HeaderName, &str)],
    ) -> DavResult<TransportResponse> {
        let mut headers = self.default_headers.clone();
        for (name, value) in extra {
            let value = HeaderValue::from_str(value)
                .map_err(|e| DavError::protocol(format!("invalid {} header: {}", name, e)))?;
            headers.insert((*name).clone(), value);
        }

        debug!("{} {}", method, key);
        self.transport.request(method, key, headers).await
    }
}

fn parse_body(body: &[u8]) -> DavResult<Props> {
    let text = str::from_utf8(body)
        .map_err(|e| DavError::protocol(format!("property body is not UTF-8: {}", e)))?;
    parse_props(text)
}

/// 207 on DELETE/MOVE reports per-member failures, so it is not a success
fn mutation_succeeded(status: u16) -> bool {
    (200..300).contains(&status) && status != MULTI_STATUS
}

fn default_headers(credentials: Option<(&str, &str)>) -> DavResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some((username, password)) = credentials {
        let token = STANDARD.encode(format!("{}:{}", username, password));
        let mut value = HeaderValue::from_str(&format!("Basic {}", token))
            .map_err(|e| DavError::InvalidConfig {
                details: format!("credentials cannot be sent as a header: {}", e),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let headers = default_headers(Some(("alice", "s3cret"))).unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value.to_str().unwrap(), "Basic YWxpY2U6czNjcmV0");
        assert!(value.is_sensitive());

        assert!(default_headers(None).unwrap().is_empty());
    }

    #[test]
    fn test_mutation_success_codes() {
        assert!(mutation_succeeded(200));
        assert!(mutation_succeeded(201));
        assert!(mutation_succeeded(204));
        assert!(!mutation_succeeded(207));
        assert!(!mutation_succeeded(404));
        assert!(!mutation_succeeded(412));
    }
}
