use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::errors::RuleError;
use crate::fetcher::{FetcherConfig, HttpFetcher, UserAgentPolicy};
use crate::filters::FilterOption;
use crate::pagination::{PaginationMode, UrlTemplate};
use crate::rate_limit::{HostRateLimiter, RateLimitConfig};
use crate::rules::ExtractionRuleSet;

/// One catalog listing endpoint (browse, search or latest) of a source.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEndpoint {
    pub url: UrlTemplate,
    pub pagination: PaginationMode,
}

fn default_sub_page_url() -> String {
    "{url}".to_string()
}

/// How chapter sub-pages beyond the first are addressed.
///
/// `{url}` expands to the chapter's canonical URL, `{page}` to the sub-page
/// number (2..=bound; sub-page 1 is the already-fetched detail document).
#[derive(Debug, Clone, Deserialize)]
pub struct SubPageConfig {
    #[serde(default = "default_sub_page_url")]
    pub url: String,
}

impl Default for SubPageConfig {
    fn default() -> Self {
        Self { url: default_sub_page_url() }
    }
}

impl SubPageConfig {
    pub fn expand(&self, chapter_url: &Url, page: u32) -> Result<Url, RuleError> {
        let expanded = self
            .url
            .replace("{url}", chapter_url.as_str())
            .replace("{page}", &page.to_string());
        Url::parse(&expanded).map_err(|e| RuleError::InvalidTemplate {
            template: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

fn default_chapter_label() -> String {
    "Gallery".to_string()
}

/// Complete declarative description of one source.
///
/// Adding a site means supplying a new instance of this struct (in code or
/// TOML); engine logic never branches on a particular source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub base_url: Url,
    #[serde(default)]
    pub user_agents: UserAgentPolicy,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Extra request headers (e.g. a Referer some CDNs insist on).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub browse: ListingEndpoint,
    #[serde(default)]
    pub search: Option<ListingEndpoint>,
    #[serde(default)]
    pub latest: Option<ListingEndpoint>,
    pub rules: ExtractionRuleSet,
    #[serde(default)]
    pub sub_pages: SubPageConfig,
    /// Chapter label used when the publish-date rule yields nothing.
    #[serde(default = "default_chapter_label")]
    pub chapter_label: String,
    #[serde(default)]
    pub filters: Vec<FilterOption>,
}

impl SourceConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, RuleError> {
        toml::from_str(input).map_err(|e| RuleError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Static request headers for this source. Invalid entries are dropped
    /// with a warning rather than failing the walk.
    pub fn request_headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(n), Ok(v)) => {
                    map.insert(n, v);
                }
                _ => log::warn!("{}: dropping invalid header `{}`", self.name, name),
            }
        }
        map
    }

    /// Build the reqwest-backed fetcher for this source, with its own
    /// rate-limiter instance. Call once per source and share the result:
    /// the limiter only gates concurrent walks if they go through the same
    /// fetcher.
    pub fn http_fetcher(&self) -> Result<HttpFetcher, RuleError> {
        let limiter = Arc::new(HostRateLimiter::new(&self.rate_limit));
        HttpFetcher::new(&self.fetcher, self.user_agents, limiter)
    }
}
