use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::ClientBuilder;
use serde::Deserialize;
use url::Url;

use crate::document::Document;
use crate::errors::{FetchError, RuleError};
use crate::rate_limit::HostRateLimiter;

/// Desktop user agents to rotate through to avoid bot detection
const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Mobile pool, for sources that serve the scrape-friendly markup only to
/// phone clients
const MOBILE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0.6099.119 Mobile/15E148 Safari/604.1",
];

/// Which user-agent pool a source draws from, one pick per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAgentPolicy {
    #[default]
    Desktop,
    Mobile,
}

impl UserAgentPolicy {
    pub fn pick(&self) -> &'static str {
        let pool = match self {
            UserAgentPolicy::Desktop => DESKTOP_USER_AGENTS,
            UserAgentPolicy::Mobile => MOBILE_USER_AGENTS,
        };
        let mut rng = rand::thread_rng();
        pool[rng.gen_range(0..pool.len())]
    }
}

fn default_timeout_secs() -> u64 { 30 }
fn default_true() -> bool { true }

/// HTTP client settings for a source.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enable_cookies: bool,
    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self { timeout_secs: 30, enable_cookies: true, enable_compression: true }
    }
}

/// Capability boundary for retrieving documents.
///
/// Implementations own rate limiting and user-agent rotation; callers just
/// ask for a URL. Failures come back classified, never as a panic. The
/// engine performs no retries on top of this — a transient failure is
/// surfaced to the host, which decides about backoff.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<Document, FetchError>;
}

/// reqwest-backed fetcher with browser-mimicking headers.
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: UserAgentPolicy,
    limiter: Arc<HostRateLimiter>,
}

impl HttpFetcher {
    pub fn new(
        config: &FetcherConfig,
        policy: UserAgentPolicy,
        limiter: Arc<HostRateLimiter>,
    ) -> Result<Self, RuleError> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(config.enable_cookies)
            .gzip(config.enable_compression)
            .brotli(config.enable_compression)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        // Default headers that mimic a real browser
        let mut headers = HeaderMap::new();
        headers.insert("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8".parse().map_err(|_| RuleError::Config("invalid default header".into()))?);
        headers.insert("Accept-Language", "en-US,en;q=0.9".parse().map_err(|_| RuleError::Config("invalid default header".into()))?);
        headers.insert("DNT", "1".parse().map_err(|_| RuleError::Config("invalid default header".into()))?);
        headers.insert("Connection", "keep-alive".parse().map_err(|_| RuleError::Config("invalid default header".into()))?);
        headers.insert("Upgrade-Insecure-Requests", "1".parse().map_err(|_| RuleError::Config("invalid default header".into()))?);
        builder = builder.default_headers(headers);

        let client = builder
            .build()
            .map_err(|e| RuleError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, policy, limiter })
    }

    fn classify(e: reqwest::Error, url: &Url) -> FetchError {
        let url = url.to_string();
        if e.is_timeout() {
            FetchError::Timeout { url }
        } else if e.is_decode() || e.is_body() {
            FetchError::ParseFailure { url }
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus { status: status.as_u16(), url }
        } else {
            FetchError::NetworkUnreachable { url }
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<Document, FetchError> {
        self.limiter.acquire().await;

        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", self.policy.pick())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| Self::classify(e, url))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("HTTP {} from {}", status, url);
            return Err(FetchError::HttpStatus { status: status.as_u16(), url: url.to_string() });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|_| FetchError::ParseFailure { url: url.to_string() })?;

        log::debug!("fetched {} bytes from {}", body.len(), final_url);
        Ok(Document::new(final_url, body))
    }
}
