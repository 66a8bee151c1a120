use std::time::Duration;

use crate::errors::{DavError, DavResult};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Covers the per-entry stats that follow a listing
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3;

/// WebDAV session configuration
#[derive(Debug, Clone)]
pub struct WebDAVConfig {
    pub server_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
}

impl WebDAVConfig {
    /// Creates a new WebDAV configuration with default timeouts
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            username: None,
            password: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> DavResult<()> {
        if self.server_url.is_empty() {
            return Err(DavError::InvalidConfig {
                details: "Server URL cannot be empty".to_string(),
            });
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(DavError::InvalidConfig {
                details: "Server URL must start with http:// or https://".to_string(),
            });
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(DavError::InvalidConfig {
                details: "A password requires a username".to_string(),
            });
        }

        if self.timeout_seconds == 0 {
            return Err(DavError::InvalidConfig {
                details: "Timeout must be at least one second".to_string(),
            });
        }

        if self.cache_ttl_seconds == 0 {
            return Err(DavError::InvalidConfig {
                details: "Cache TTL must be at least one second".to_string(),
            });
        }

        Ok(())
    }

    /// Gets the timeout duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Username/password pair when authentication is configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.username
            .as_deref()
            .map(|user| (user, self.password.as_deref().unwrap_or("")))
    }
}
