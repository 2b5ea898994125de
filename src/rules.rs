//! Declarative extraction rules.
//!
//! A source is described by data, not code: every site-specific detail the
//! engine needs to read out of a document is a [`Locator`] (CSS selector plus
//! an extraction step). New sources supply a new rule set instance; engine
//! logic never branches on a source.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::document::{absolutize, Document};
use crate::errors::{ExtractionError, RuleError};
use crate::models::{CatalogEntry, ChapterRef, EntryDetail, EntryId};

/// What to read from a matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// Concatenated text content, trimmed.
    Text,
    /// A named attribute, e.g. `href` or `data-src`.
    Attr(String),
}

/// A compiled CSS selector plus its extraction step.
///
/// Selectors compile eagerly so a bad one surfaces at configuration time,
/// not in the middle of a walk.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawLocator")]
pub struct Locator {
    raw: String,
    selector: Selector,
    extract: Extract,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocator {
    Selector(String),
    Full { selector: String, attr: Option<String> },
}

impl TryFrom<RawLocator> for Locator {
    type Error = RuleError;

    fn try_from(raw: RawLocator) -> Result<Self, RuleError> {
        match raw {
            RawLocator::Selector(s) => Locator::text(&s),
            RawLocator::Full { selector, attr: Some(a) } => Locator::attr(&selector, &a),
            RawLocator::Full { selector, attr: None } => Locator::text(&selector),
        }
    }
}

impl Locator {
    pub fn new(selector: &str, extract: Extract) -> Result<Self, RuleError> {
        let compiled = Selector::parse(selector).map_err(|_| RuleError::InvalidSelector {
            selector: selector.to_string(),
        })?;
        Ok(Self { raw: selector.to_string(), selector: compiled, extract })
    }

    /// Locator extracting element text.
    pub fn text(selector: &str) -> Result<Self, RuleError> {
        Self::new(selector, Extract::Text)
    }

    /// Locator extracting a named attribute.
    pub fn attr(selector: &str, attr: &str) -> Result<Self, RuleError> {
        Self::new(selector, Extract::Attr(attr.to_string()))
    }

    pub fn selector_str(&self) -> &str {
        &self.raw
    }

    fn extract_from(&self, el: ElementRef<'_>) -> Option<String> {
        let value = match &self.extract {
            Extract::Text => el.text().collect::<String>(),
            Extract::Attr(name) => el.value().attr(name)?.to_string(),
        };
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    pub(crate) fn first_in_doc(&self, html: &Html) -> Option<String> {
        html.select(&self.selector).find_map(|el| self.extract_from(el))
    }

    pub(crate) fn all_in_doc(&self, html: &Html) -> Vec<String> {
        html.select(&self.selector)
            .filter_map(|el| self.extract_from(el))
            .collect()
    }

    pub(crate) fn first_in(&self, scope: ElementRef<'_>) -> Option<String> {
        scope.select(&self.selector).find_map(|el| self.extract_from(el))
    }

    pub(crate) fn count_in_doc(&self, html: &Html) -> usize {
        html.select(&self.selector).count()
    }
}

/// Publish-date rule: a locator, an optional regex that pulls the date
/// substring out of the raw value, and a chrono format string.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawDateRule")]
pub struct DateRule {
    locator: Locator,
    pattern: Option<Regex>,
    format: String,
}

#[derive(Deserialize)]
struct RawDateRule {
    locator: Locator,
    #[serde(default)]
    pattern: Option<String>,
    format: String,
}

impl TryFrom<RawDateRule> for DateRule {
    type Error = RuleError;

    fn try_from(raw: RawDateRule) -> Result<Self, RuleError> {
        DateRule::new(raw.locator, raw.pattern.as_deref(), raw.format)
    }
}

impl DateRule {
    pub fn new(locator: Locator, pattern: Option<&str>, format: String) -> Result<Self, RuleError> {
        let pattern = match pattern {
            Some(p) => Some(Regex::new(p).map_err(|e| RuleError::Config(format!(
                "invalid date pattern `{}`: {}",
                p, e
            )))?),
            None => None,
        };
        Ok(Self { locator, pattern, format })
    }

    /// Extract the raw date label and, when it parses, the timestamp.
    ///
    /// Absent matches and unparsable dates are not errors; they simply leave
    /// the corresponding field unset.
    fn extract(&self, html: &Html) -> (Option<String>, Option<DateTime<Utc>>) {
        let raw = match self.locator.first_in_doc(html) {
            Some(v) => v,
            None => return (None, None),
        };
        let label = match &self.pattern {
            Some(re) => match re.captures(&raw).and_then(|c| c.get(1)) {
                Some(m) => m.as_str().to_string(),
                None => return (None, None),
            },
            None => raw,
        };
        let parsed = NaiveDate::parse_from_str(&label, &self.format)
            .ok()
            .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
        (Some(label), parsed)
    }
}

/// How to determine the sub-page bound of a chapter from its first document.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PageCountRule {
    /// The number of matched elements is the bound (e.g. one link per page).
    ElementCount { locator: Locator },
    /// The first match's extracted value, parsed as an integer.
    Number { locator: Locator },
}

impl PageCountRule {
    fn apply(&self, html: &Html) -> u32 {
        let count = match self {
            PageCountRule::ElementCount { locator } => locator.count_in_doc(html) as u32,
            PageCountRule::Number { locator } => locator
                .first_in_doc(html)
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1),
        };
        count.max(1)
    }
}

/// The full set of named locators for one source.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRuleSet {
    /// Catalog-item container within a listing page.
    pub entry: Locator,
    /// Entry title, scoped to the container. Required per record.
    pub entry_title: Locator,
    /// Entry canonical link, scoped to the container. Required per record.
    pub entry_link: Locator,
    /// Entry thumbnail, scoped to the container.
    #[serde(default)]
    pub entry_thumbnail: Option<Locator>,
    /// Title on the detail page. Required.
    pub detail_title: Locator,
    /// Tag links on the detail page.
    #[serde(default)]
    pub detail_tags: Option<Locator>,
    /// Canonical self-link on the detail page. Required for the chapter.
    pub canonical_link: Locator,
    /// Publish-date rule applied to the detail page.
    #[serde(default)]
    pub publish_date: Option<DateRule>,
    /// Page images within a chapter (sub-)page.
    pub page_image: Locator,
    /// Sub-page bound rule applied to the chapter's first document.
    #[serde(default)]
    pub page_count: Option<PageCountRule>,
}

/// Result of one extraction pass over a listing document.
#[derive(Debug)]
pub struct ListingExtraction {
    /// One result per catalog-item container, in document order. A record
    /// missing a required field carries its error instead of aborting the
    /// rest of the page.
    pub records: Vec<Result<CatalogEntry, ExtractionError>>,
    /// Extracted next-page value, when a locator was supplied and matched.
    pub next_value: Option<String>,
    /// Max-page bound, when a count rule was supplied.
    pub max_pages: Option<u32>,
}

/// Result of one extraction pass over a chapter (sub-)page document.
#[derive(Debug)]
pub struct PageExtraction {
    pub images: Vec<String>,
    pub sub_page_count: u32,
}

impl ExtractionRuleSet {
    /// One synchronous pass over a listing document: catalog records plus
    /// whatever the pagination strategy needs.
    pub fn listing(
        &self,
        doc: &Document,
        next_page: Option<&Locator>,
        max_pages: Option<&PageCountRule>,
    ) -> ListingExtraction {
        let html = doc.html();
        let entry_sel = &self.entry.selector;

        let mut records = Vec::new();
        for container in html.select(entry_sel) {
            records.push(self.entry_from_element(doc, container));
        }

        let next_value = next_page.and_then(|loc| loc.first_in_doc(&html));
        let max_pages = max_pages.map(|rule| rule.apply(&html));

        ListingExtraction { records, next_value, max_pages }
    }

    fn entry_from_element(
        &self,
        doc: &Document,
        container: ElementRef<'_>,
    ) -> Result<CatalogEntry, ExtractionError> {
        let title = self.entry_title.first_in(container).ok_or_else(|| {
            ExtractionError::MissingRequiredField { field: "title", url: doc.url().to_string() }
        })?;
        let href = self.entry_link.first_in(container).ok_or_else(|| {
            ExtractionError::MissingRequiredField { field: "link", url: doc.url().to_string() }
        })?;
        let link = absolutize(doc.url(), &href)?;
        let thumbnail_url = self
            .entry_thumbnail
            .as_ref()
            .and_then(|loc| loc.first_in(container));

        Ok(CatalogEntry { id: EntryId::from_url(&link), title, thumbnail_url })
    }

    /// Extract the detail-page metadata. The title is required; tags are not.
    pub fn detail(&self, doc: &Document) -> Result<EntryDetail, ExtractionError> {
        let html = doc.html();
        let title = self.detail_title.first_in_doc(&html).ok_or_else(|| {
            ExtractionError::MissingRequiredField { field: "title", url: doc.url().to_string() }
        })?;
        let tags = self
            .detail_tags
            .as_ref()
            .map(|loc| loc.all_in_doc(&html))
            .unwrap_or_default();
        Ok(EntryDetail { title, tags })
    }

    /// Derive the single virtual chapter from a detail document.
    ///
    /// The canonical link is required; the date rule only ever fills in the
    /// label and timestamp when it succeeds.
    pub fn chapter(&self, doc: &Document, default_label: &str) -> Result<ChapterRef, ExtractionError> {
        let html = doc.html();
        let href = self.canonical_link.first_in_doc(&html).ok_or_else(|| {
            ExtractionError::MissingRequiredField {
                field: "canonical link",
                url: doc.url().to_string(),
            }
        })?;
        let url = absolutize(doc.url(), &href)?;

        let (label, published_at) = match &self.publish_date {
            Some(rule) => rule.extract(&html),
            None => (None, None),
        };

        Ok(ChapterRef {
            id: EntryId::from_url(&url),
            display_label: label.unwrap_or_else(|| default_label.to_string()),
            published_at,
            url,
        })
    }

    /// One pass over a chapter (sub-)page: images in document order plus the
    /// sub-page bound (meaningful on the first document only; defaults to 1).
    pub fn pages(&self, doc: &Document) -> PageExtraction {
        let html = doc.html();
        let images = self
            .page_image
            .all_in_doc(&html)
            .into_iter()
            .map(|src| {
                doc.url()
                    .join(&src)
                    .map(|u| u.to_string())
                    .unwrap_or(src)
            })
            .collect();
        let sub_page_count = self
            .page_count
            .as_ref()
            .map(|rule| rule.apply(&html))
            .unwrap_or(1);
        PageExtraction { images, sub_page_count }
    }
}
