//! Shared test support: a deterministic in-memory fetcher and fixture
//! builders. No test in this suite touches the network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use url::Url;

use rust_catalog_scraper::{
    Document, DocumentFetcher, ExtractionRuleSet, FetchError, ListingEndpoint, LinkAdvance,
    Locator, PageCountRule, PaginationMode, SourceConfig, SubPageConfig, UrlTemplate,
};

/// Scripted response for one URL.
#[derive(Debug)]
pub enum Scripted {
    Body(String),
    Status(u16),
    Timeout,
    Unreachable,
}

/// In-memory fetcher: every URL must be scripted, every request is logged.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Body(body.to_string()));
        self
    }

    pub fn with_failure(self, url: &str, failure: Scripted) -> Self {
        self.responses.lock().unwrap().insert(url.to_string(), failure);
        self
    }

    /// URLs fetched so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, url: &Url, _headers: &HeaderMap) -> Result<Document, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let responses = self.responses.lock().unwrap();
        match responses.get(url.as_str()) {
            Some(Scripted::Body(body)) => Ok(Document::new(url.clone(), body.clone())),
            Some(Scripted::Status(status)) => {
                Err(FetchError::HttpStatus { status: *status, url: url.to_string() })
            }
            Some(Scripted::Timeout) => Err(FetchError::Timeout { url: url.to_string() }),
            Some(Scripted::Unreachable) => {
                Err(FetchError::NetworkUnreachable { url: url.to_string() })
            }
            None => Err(FetchError::HttpStatus { status: 404, url: url.to_string() }),
        }
    }
}

pub const BASE: &str = "https://site.example";

/// Rule set matching the fixture HTML built below.
pub fn fixture_rules() -> ExtractionRuleSet {
    ExtractionRuleSet {
        entry: Locator::text("article.item").unwrap(),
        entry_title: Locator::text("h2.title").unwrap(),
        entry_link: Locator::attr("h2.title a", "href").unwrap(),
        entry_thumbnail: Some(Locator::attr("img.thumb", "data-src").unwrap()),
        detail_title: Locator::text("h1.post-title").unwrap(),
        detail_tags: Some(Locator::text(".post-tag a").unwrap()),
        canonical_link: Locator::attr("link[rel=\"canonical\"]", "href").unwrap(),
        publish_date: Some(
            rust_catalog_scraper::DateRule::new(
                Locator::attr(".entry img", "data-src").unwrap(),
                Some(r"(\d{4}/\d{2}/\d{2})"),
                "%Y/%m/%d".to_string(),
            )
            .unwrap(),
        ),
        page_image: Locator::attr(".entry p img", "data-src").unwrap(),
        page_count: Some(PageCountRule::ElementCount {
            locator: Locator::text(".page-link .post-page-numbers").unwrap(),
        }),
    }
}

/// Source whose listings follow a next link and advance via the page
/// template, the common case.
pub fn link_driven_source() -> SourceConfig {
    let next = Locator::attr(".pagination a.next", "href").unwrap();
    let mut cfg = base_source();
    cfg.browse = ListingEndpoint {
        url: UrlTemplate::new(&format!("{}/?page={{page}}", BASE)),
        pagination: PaginationMode::Link {
            next_page: Some(next.clone()),
            advance: LinkAdvance::PageTemplate,
        },
    };
    cfg.search = Some(ListingEndpoint {
        url: UrlTemplate::new(&format!("{}/page/{{page}}/?s={{query}}", BASE)),
        pagination: PaginationMode::Link { next_page: Some(next), advance: LinkAdvance::PageTemplate },
    });
    cfg
}

/// Source whose browse listing reads a page bound from the first document.
pub fn count_driven_source() -> SourceConfig {
    let mut cfg = base_source();
    cfg.browse = ListingEndpoint {
        url: UrlTemplate::new(&format!("{}/?page={{page}}", BASE)),
        pagination: PaginationMode::Count {
            max_pages: Some(PageCountRule::Number {
                locator: Locator::text("span.max-pages").unwrap(),
            }),
        },
    };
    cfg
}

fn base_source() -> SourceConfig {
    SourceConfig {
        name: "fixture".to_string(),
        base_url: Url::parse(&format!("{}/", BASE)).unwrap(),
        user_agents: Default::default(),
        rate_limit: Default::default(),
        fetcher: Default::default(),
        headers: Default::default(),
        browse: ListingEndpoint {
            url: UrlTemplate::new(&format!("{}/?page={{page}}", BASE)),
            pagination: PaginationMode::single_page(),
        },
        search: None,
        latest: None,
        rules: fixture_rules(),
        sub_pages: SubPageConfig { url: "{url}{page}/".to_string() },
        chapter_label: "Gallery".to_string(),
        filters: Vec::new(),
    }
}

/// Listing page fixture: items plus an optional next-page link.
pub fn listing_page(items: &[(&str, &str)], next_href: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for (title, href) in items {
        if href.is_empty() {
            html.push_str(&format!(
                r#"<article class="item"><h2 class="title">{}</h2></article>"#,
                title
            ));
        } else {
            html.push_str(&format!(
                r#"<article class="item"><h2 class="title"><a href="{}">{}</a></h2><img class="thumb" data-src="https://cdn.example{}cover.jpg"></article>"#,
                href, title, href
            ));
        }
    }
    if let Some(next) = next_href {
        html.push_str(&format!(
            r#"<div class="pagination"><span class="current">1</span><a class="next" href="{}">Next</a></div>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Detail/chapter page fixture with `sub_pages` page-number links and the
/// given images.
pub fn detail_page(canonical: &str, sub_pages: u32, images: &[&str], tags: &[&str]) -> String {
    let mut html = format!(
        r#"<html><head><link rel="canonical" href="{}"></head><body><h1 class="post-title">Fixture Gallery</h1>"#,
        canonical
    );
    html.push_str("<span class=\"post-tag\">");
    for tag in tags {
        html.push_str(&format!("<a>{}</a>", tag));
    }
    html.push_str("</span>");
    if sub_pages > 1 {
        html.push_str("<div class=\"page-link\">");
        for n in 1..=sub_pages {
            html.push_str(&format!("<span class=\"post-page-numbers\">{}</span>", n));
        }
        html.push_str("</div>");
    }
    html.push_str("<div class=\"entry\">");
    for img in images {
        html.push_str(&format!("<p><img data-src=\"{}\"></p>", img));
    }
    html.push_str("</div></body></html>");
    html
}

/// Sub-page fixture: images only.
pub fn sub_page(images: &[&str]) -> String {
    let mut html = String::from("<html><body><div class=\"entry\">");
    for img in images {
        html.push_str(&format!("<p><img data-src=\"{}\"></p>", img));
    }
    html.push_str("</div></body></html>");
    html
}
