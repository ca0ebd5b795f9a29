//! Client configuration.
//!
//! Defaults suit a local development API. [`ClientConfig::from_env`] applies
//! `BLOG_*` environment overrides, and [`ClientConfig::from_json_file`] reads
//! the same fields from disk.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlogError, Result};
use crate::retry::RetryConfig;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_FETCH_LIMIT: u32 = 1000;
const DEFAULT_MAX_CONTENT_LENGTH: usize = 500;

pub const ENV_BASE_URL: &str = "BLOG_API_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "BLOG_API_TIMEOUT_MS";
pub const ENV_MAX_ATTEMPTS: &str = "BLOG_API_MAX_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "BLOG_API_RETRY_DELAY_MS";
pub const ENV_PAGE_SIZE: &str = "BLOG_PAGE_SIZE";
pub const ENV_FETCH_LIMIT: &str = "BLOG_FETCH_LIMIT";

/// Settings for [`BlogClient`](crate::BlogClient) and [`PostStore`](crate::PostStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API origin, without the `/api/...` path.
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// Posts revealed per `load_more`.
    pub page_size: usize,
    /// `limit` sent when fetching the whole collection.
    pub fetch_limit: u32,
    pub max_content_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_attempts: retry.max_attempts,
            retry_base_delay_ms: retry.base_delay.as_millis() as u64,
            page_size: DEFAULT_PAGE_SIZE,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn fetch_limit(mut self, fetch_limit: u32) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    /// Defaults overridden by any `BLOG_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(base_url) = get(ENV_BASE_URL) {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(value) = get(ENV_TIMEOUT_MS) {
            config.request_timeout_ms = parse_var(ENV_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = get(ENV_MAX_ATTEMPTS) {
            config.max_attempts = parse_var(ENV_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = get(ENV_RETRY_DELAY_MS) {
            config.retry_base_delay_ms = parse_var(ENV_RETRY_DELAY_MS, &value)?;
        }
        if let Some(value) = get(ENV_PAGE_SIZE) {
            config.page_size = parse_var(ENV_PAGE_SIZE, &value)?;
        }
        if let Some(value) = get(ENV_FETCH_LIMIT) {
            config.fetch_limit = parse_var(ENV_FETCH_LIMIT, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BlogError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            BlogError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| BlogError::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BlogError::Config(format!(
                "base URL must be http or https, got {:?}",
                url.scheme()
            )));
        }
        if self.page_size == 0 {
            return Err(BlogError::Config("page size must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| BlogError::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.fetch_limit, 1000);
        assert_eq!(config.request_timeout_duration(), Duration::from_secs(30));
        assert_eq!(config.retry(), RetryConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "https://api.example.com"),
            (ENV_MAX_ATTEMPTS, "5"),
            (ENV_RETRY_DELAY_MS, "250"),
            (ENV_PAGE_SIZE, "20"),
            (ENV_FETCH_LIMIT, ""),
        ]))
        .expect("config");
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.retry().max_attempts, 5);
        assert_eq!(config.retry().base_delay, Duration::from_millis(250));
        assert_eq!(config.page_size, 20);
        assert_eq!(config.fetch_limit, 1000);
    }

    #[test]
    fn bad_env_values_are_config_errors() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_PAGE_SIZE, "ten")]))
            .expect_err("unparsable");
        assert!(matches!(err, BlogError::Config(_)));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_BASE_URL, "ftp://example.com")]))
            .expect_err("wrong scheme");
        assert!(err.message().contains("http or https"));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_PAGE_SIZE, "0")]))
            .expect_err("empty pages");
        assert!(matches!(err, BlogError::Config(_)));
    }

    #[test]
    fn json_file_keeps_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"base_url":"https://blog.example.com","page_size":5}}"#)
            .expect("write");
        let config = ClientConfig::from_json_file(file.path()).expect("config");
        assert_eq!(config.base_url, "https://blog.example.com");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.max_attempts, 3);
    }
}
