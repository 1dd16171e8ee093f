//! Client configuration

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Production console API
pub const CONSOLE_API_URL: &str = "https://api.capellaspace.com";

/// Path of the STAC search endpoint, relative to the base URL
pub const SEARCH_PATH: &str = "/catalog/search";

/// Environment variable overriding the base URL
pub const CONSOLE_API_URL_ENV: &str = "CONSOLE_API_URL";

/// Server-side ceiling for features per search page
pub const DEFAULT_PAGE_SIZE: u64 = 500;

/// Features returned by a search that does not specify `limit`
pub const DEFAULT_MAX_FEATURE_COUNT: u64 = 500;

/// Time to establish the TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall time for one request
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Configuration shared by the session and the search/order components
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    page_size: u64,
    default_limit: u64,
    retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: CONSOLE_API_URL.to_string(),
            connect_timeout: Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            default_limit: DEFAULT_MAX_FEATURE_COUNT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with the base URL taken from `CONSOLE_API_URL` when set
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(CONSOLE_API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_base_url(url),
            _ => config,
        }
    }

    /// Override the base URL (trailing slashes are dropped)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override connect and request timeouts
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Override the page-size ceiling (minimum 1)
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override the retry policy used by the search page fetcher
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of the search endpoint
    pub fn search_url(&self) -> String {
        format!("{}{}", self.base_url, SEARCH_PATH)
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Whole-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Page-size ceiling
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Feature cap for searches without `limit`
    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    /// Retry policy for search pages
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}
