//! MissKon - photo gallery site, serves clean markup to mobile clients.

use url::Url;

use crate::config::{ListingEndpoint, SourceConfig, SubPageConfig};
use crate::errors::RuleError;
use crate::fetcher::{FetcherConfig, UserAgentPolicy};
use crate::filters::FilterOption;
use crate::pagination::{LinkAdvance, PaginationMode, UrlTemplate};
use crate::rate_limit::RateLimitConfig;
use crate::rules::{DateRule, ExtractionRuleSet, Locator, PageCountRule};

const BASE_URL: &str = "https://misskon.com";

pub fn source() -> Result<SourceConfig, RuleError> {
    let rules = ExtractionRuleSet {
        entry: Locator::text("article.item-list")?,
        entry_title: Locator::text(".post-box-title")?,
        entry_link: Locator::attr(".post-box-title a", "href")?,
        entry_thumbnail: Some(Locator::attr(".post-thumbnail img", "data-src")?),
        detail_title: Locator::text("article > .post-inner .post-title")?,
        detail_tags: Some(Locator::text("article > .post-inner .post-tag > a")?),
        canonical_link: Locator::attr("link[rel=\"canonical\"]", "href")?,
        // Upload date only appears inside the image CDN paths, e.g.
        // .../uploads/2024/03/15/01.jpg
        publish_date: Some(DateRule::new(
            Locator::attr(".entry img", "data-src")?,
            Some(r"(\d{4}/\d{2}/\d{2})"),
            "%Y/%m/%d".to_string(),
        )?),
        page_image: Locator::attr("div.post-inner > div.entry > p > img", "data-src")?,
        page_count: Some(PageCountRule::ElementCount {
            locator: Locator::text("div.post-inner div.page-link:nth-child(1) .post-page-numbers")?,
        }),
    };

    Ok(SourceConfig {
        name: "MissKon".to_string(),
        base_url: Url::parse(BASE_URL).map_err(|e| RuleError::Config(e.to_string()))?,
        user_agents: UserAgentPolicy::Mobile,
        rate_limit: RateLimitConfig { max_requests: 10, window_ms: 1000 },
        fetcher: FetcherConfig::default(),
        headers: Default::default(),
        // Browse is the fixed weekly-top listing; it has no pagination.
        browse: ListingEndpoint {
            url: UrlTemplate::fixed(&format!("{}/top7/", BASE_URL)),
            pagination: PaginationMode::single_page(),
        },
        search: Some(ListingEndpoint {
            url: UrlTemplate::new(&format!("{}/page/{{page}}/?s={{query}}", BASE_URL)),
            pagination: PaginationMode::Link {
                next_page: Some(Locator::attr(
                    "div.content > div.pagination > span.current + a",
                    "href",
                )?),
                advance: LinkAdvance::PageTemplate,
            },
        }),
        latest: Some(ListingEndpoint {
            url: UrlTemplate::with_first_page(&format!("{}/page/{{page}}", BASE_URL), BASE_URL),
            pagination: PaginationMode::Link {
                next_page: Some(Locator::attr(".current + a.page", "href")?),
                advance: LinkAdvance::PageTemplate,
            },
        }),
        rules,
        sub_pages: SubPageConfig { url: "{url}{page}/".to_string() },
        chapter_label: "Gallery".to_string(),
        filters: tag_filters(),
    })
}

fn tag(name: &str, path: &str, group: &str) -> FilterOption {
    FilterOption::new(name, &format!("{}{}", BASE_URL, path), Some(group))
}

/// Tag catalog, grouped the way the site's own menu groups them. Selecting
/// any of these replaces free-text search entirely.
fn tag_filters() -> Vec<FilterOption> {
    let mut options = vec![FilterOption::none("未选择")];
    options.extend([
        tag("Top 3 days", "/top3/", "Top"),
        tag("Top 7 days", "/top7/", "Top"),
        tag("Top 30 days", "/top30/", "Top"),
        tag("Top 60 days", "/top60/", "Top"),
    ]);
    options.extend([
        tag("中国:[MTCos] 喵糖映画", "/tag/mtcos/", "中国"),
        tag("中国:HuaYang", "/tag/huayang/", "中国"),
        tag("中国:IMISS", "/tag/imiss/", "中国"),
        tag("中国:MFStar", "/tag/mfstar/", "中国"),
        tag("中国:MiStar", "/tag/mistar/", "中国"),
        tag("中国:MyGirl", "/tag/mygirl/", "中国"),
        tag("中国:QingDouKe", "/tag/qingdouke/", "中国"),
        tag("中国:TouTiao", "/tag/toutiao/", "中国"),
        tag("中国:UGIRLS", "/tag/ugirls/", "中国"),
        tag("中国:XiaoYu", "/tag/xiaoyu/", "中国"),
        tag("中国:XingYan", "/tag/xingyan/", "中国"),
        tag("中国:XIUREN", "/tag/xiuren/", "中国"),
        tag("中国:YouMi", "/tag/youmi/", "中国"),
        tag("中国:YouWu", "/tag/youwu/", "中国"),
    ]);
    options.extend([
        tag("韩国:Bimilstory", "/tag/bimilstory/", "韩国"),
        tag("韩国:BLUECAKE", "/tag/bluecake/", "韩国"),
        tag("韩国:DJAWA", "/tag/djawa/", "韩国"),
        tag("韩国:Espacia Korea", "/tag/espacia-korea/", "韩国"),
        tag("韩国:LEEHEE EXPRESS", "/tag/leehee-express/", "韩国"),
        tag("韩国:Loozy", "/tag/loozy/", "韩国"),
        tag("韩国:Moon Night Snap", "/tag/moon-night-snap/", "韩国"),
        tag("韩国:Pure Media", "/tag/pure-media/", "韩国"),
        tag("韩国:SAINT Photolife", "/tag/saint-photolife/", "韩国"),
        tag("韩国:SWEETBOX", "/tag/sweetbox/", "韩国"),
    ]);
    options.extend([
        tag("其他:AI Generated", "/tag/ai-generated/", "其他"),
        tag("其他:Cosplay", "/tag/cosplay/", "其他"),
        tag("其他:JP", "/tag/jp/", "其他"),
        tag("其他:Patreon", "/tag/patreon/", "其他"),
    ]);
    options
}
