use std::borrow::Cow;
use url::Url;

use crate::errors::{DavError, DavResult};

/// Centralized URL and path management for WebDAV operations
///
/// Every path handed to the transport and every cache key goes through
/// here, so a key built from a listing href and a key built from a `stat`
/// argument are byte-identical for the same resource.
#[derive(Debug, Clone)]
pub struct WebDAVUrlManager {
    /// `scheme://host[:port]`, no trailing slash
    origin: String,
    /// Percent-decoded segments of the URL path
    base_segments: Vec<String>,
}

impl WebDAVUrlManager {
    /// Builds the manager from the session URL.
    ///
    /// Only `http` and `https` are accepted; a query string or fragment is
    /// rejected because they cannot be combined with per-resource paths.
    pub fn from_url(server_url: &str) -> DavResult<Self> {
        let invalid = |reason: &str| DavError::InvalidUrl {
            url: server_url.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(server_url).map_err(|e| invalid(&e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if url.query().is_some() {
            return Err(invalid("query strings are not allowed"));
        }
        if url.fragment().is_some() {
            return Err(invalid("fragments are not allowed"));
        }

        let origin = url.origin().ascii_serialization();
        let base_segments = decoded_segments(url.path());

        Ok(Self { origin, base_segments })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Base path as sent on the wire, e.g. `/remote.php/webdav`
    pub fn base_path(&self) -> String {
        encode_segments(&self.base_segments)
    }

    /// Turns a path relative to the mount into the wire path and cache key.
    ///
    /// Input:  "Photos//2024/"
    /// Output: "/remote.php/webdav/Photos/2024"
    pub fn normalize_path(&self, href: &str) -> String {
        let segments: Vec<String> = self
            .base_segments
            .iter()
            .cloned()
            .chain(href.split('/').filter(|s| !s.is_empty()).map(str::to_string))
            .collect();
        encode_segments(&segments)
    }

    /// Turns an href from a multistatus body into the cache key of that
    /// resource. Hrefs may be absolute URLs or absolute paths.
    ///
    /// Input:  "https://nas.example.com/remote.php/webdav/My%20Files/"
    /// Output: "/remote.php/webdav/My%20Files"
    pub fn href_to_key(&self, href: &str) -> String {
        let path = match Url::parse(href) {
            Ok(url) if url.has_host() => url.path().to_string(),
            _ => href.to_string(),
        };
        encode_segments(&decoded_segments(&path))
    }

    /// Absolute URL of a normalized path, as used by `Destination` headers
    pub fn url_for_key(&self, key: &str) -> String {
        format!("{}{}", self.origin, key)
    }

    /// Decoded final segment of an href; `None` for the root
    pub fn display_name(&self, href: &str) -> Option<String> {
        let key = self.href_to_key(href);
        decoded_segments(&key).pop()
    }
}

fn decoded_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .unwrap_or(Cow::Borrowed(segment))
                .into_owned()
        })
        .collect()
}

fn encode_segments(segments: &[String]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments
        .iter()
        .fold(String::new(), |mut path, segment| {
            path.push('/');
            path.push_str(&urlencoding::encode(segment));
            path
        })
}
