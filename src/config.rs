use anyhow::{anyhow, Result};
use std::env;

use crate::services::webdav::config::{
    WebDAVConfig, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_TIMEOUT_SECONDS,
};

/// Process configuration read from the environment (and `.env`)
#[derive(Clone, Debug)]
pub struct Config {
    pub dav_url: Option<String>,
    pub dav_username: Option<String>,
    pub dav_password: Option<String>,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            dav_url: env::var("DAVMOUNT_URL").ok(),
            dav_username: env::var("DAVMOUNT_USERNAME").ok(),
            dav_password: env::var("DAVMOUNT_PASSWORD").ok(),
            timeout_seconds: parse_seconds("DAVMOUNT_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS)?,
            cache_ttl_seconds: parse_seconds("DAVMOUNT_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?,
        })
    }

    /// Session configuration; `url` overrides `DAVMOUNT_URL` when given
    pub fn webdav_config(&self, url: Option<&str>) -> Result<WebDAVConfig> {
        let server_url = url
            .map(str::to_string)
            .or_else(|| self.dav_url.clone())
            .ok_or_else(|| anyhow!("No WebDAV URL given (use --url or DAVMOUNT_URL)"))?;

        let config = WebDAVConfig {
            server_url,
            username: self.dav_username.clone(),
            password: self.dav_password.clone(),
            timeout_seconds: self.timeout_seconds,
            cache_ttl_seconds: self.cache_ttl_seconds,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_seconds(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} must be a number of seconds, got '{}'", name, value)),
        Err(_) => Ok(default),
    }
}
