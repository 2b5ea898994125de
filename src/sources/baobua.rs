//! BaoBua - photo album site. No latest-updates listing; category filters
//! replace keyword search when selected.

use url::Url;

use crate::config::{ListingEndpoint, SourceConfig, SubPageConfig};
use crate::errors::RuleError;
use crate::fetcher::{FetcherConfig, UserAgentPolicy};
use crate::filters::FilterOption;
use crate::pagination::{LinkAdvance, PaginationMode, UrlTemplate};
use crate::rate_limit::RateLimitConfig;
use crate::rules::{DateRule, ExtractionRuleSet, Locator, PageCountRule};

const BASE_URL: &str = "https://www.baobua.net";

pub fn source() -> Result<SourceConfig, RuleError> {
    let rules = ExtractionRuleSet {
        entry: Locator::text("article.post")?,
        entry_title: Locator::text("div.read-title")?,
        entry_link: Locator::attr("a.popunder", "href")?,
        entry_thumbnail: Some(Locator::attr("img", "src")?),
        detail_title: Locator::text("div.breadcrumb-trail > ul.trail-items li.trail-end")?,
        detail_tags: Some(Locator::text(
            "div.breadcrumb-trail > ul.trail-items li:not(.trail-end):not(.trail-begin)",
        )?),
        canonical_link: Locator::attr("div.breadcrumb-trail li.trail-end > a", "href")?,
        publish_date: Some(DateRule::new(
            Locator::text("span.item-metadata.posts-date")?,
            None,
            "%a %b %d %Y".to_string(),
        )?),
        page_image: Locator::attr("div.entry-content.read-details img.wp-image", "src")?,
        // The "next" pager link carries the total album page count.
        page_count: Some(PageCountRule::Number {
            locator: Locator::text("div.nav-links > a.next.page-numbers")?,
        }),
    };

    let next_page = Locator::attr("nav.pagination a.next", "href")?;

    Ok(SourceConfig {
        name: "BaoBua".to_string(),
        base_url: Url::parse(BASE_URL).map_err(|e| RuleError::Config(e.to_string()))?,
        user_agents: UserAgentPolicy::Desktop,
        rate_limit: RateLimitConfig::default(),
        fetcher: FetcherConfig::default(),
        headers: Default::default(),
        browse: ListingEndpoint {
            url: UrlTemplate::new(&format!("{}/?page={{page}}", BASE_URL)),
            pagination: PaginationMode::Link {
                next_page: Some(next_page.clone()),
                advance: LinkAdvance::PageTemplate,
            },
        },
        search: Some(ListingEndpoint {
            url: UrlTemplate::new(&format!("{}/?q={{query}}&page={{page}}", BASE_URL)),
            pagination: PaginationMode::Link {
                next_page: Some(next_page),
                advance: LinkAdvance::PageTemplate,
            },
        }),
        // The site has no latest-updates listing.
        latest: None,
        rules,
        sub_pages: SubPageConfig { url: "{url}?p={page}".to_string() },
        chapter_label: "Gallery".to_string(),
        filters: category_filters(),
    })
}

fn category(name: &str, path: &str) -> FilterOption {
    FilterOption::new(name, &format!("{}{}", BASE_URL, path), Some("Category"))
}

fn category_filters() -> Vec<FilterOption> {
    vec![
        FilterOption::none("None"),
        category("XiuRen", "/c/xiuren/"),
        category("MyGirl", "/c/mygirl/"),
        category("HuaYang", "/c/huayang/"),
        category("Korea", "/c/korea/"),
        category("Japan", "/c/japan/"),
        category("Cosplay", "/c/cosplay/"),
    ]
}
